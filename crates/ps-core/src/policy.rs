//! Domain policy model
//!
//! [`DomainPolicyRecord`] is the per-domain override as stored by domain
//! management, every field optional through [`Tristate`].
//! [`GlobalDefaults`] fills whatever a record leaves open, and the result of
//! merging the two is an [`EffectivePolicy`] with nothing left undecided.

use std::fmt;

use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::pinning::Pins;
use crate::surface::RenderingSurface;
use crate::types::ListId;

// =============================================================================
// Tristate
// =============================================================================

/// A per-domain switch that may defer to the global default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Tristate {
    #[default]
    SystemDefault,
    Enabled,
    Disabled,
}

impl Tristate {
    /// Resolve against the global default in force right now.
    #[inline]
    pub fn resolve(self, default: bool) -> bool {
        match self {
            Tristate::SystemDefault => default,
            Tristate::Enabled => true,
            Tristate::Disabled => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tristate::SystemDefault => "system_default",
            Tristate::Enabled => "enabled",
            Tristate::Disabled => "disabled",
        }
    }

    fn from_code(code: i64) -> Self {
        match code {
            1 => Tristate::Enabled,
            2 => Tristate::Disabled,
            _ => Tristate::SystemDefault,
        }
    }
}

impl From<bool> for Tristate {
    fn from(enabled: bool) -> Self {
        if enabled {
            Tristate::Enabled
        } else {
            Tristate::Disabled
        }
    }
}

impl fmt::Display for Tristate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Tristate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// Stored values outside the recognized set mean "use the default".
impl<'de> Deserialize<'de> for Tristate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TristateVisitor;

        impl<'de> Visitor<'de> for TristateVisitor {
            type Value = Tristate;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("0, 1, 2, a boolean, or a tristate name")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Tristate, E> {
                Ok(Tristate::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Tristate, E> {
                Ok(Tristate::from_code(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Tristate, E> {
                Ok(i64::try_from(v).map_or(Tristate::SystemDefault, Tristate::from_code))
            }

            fn visit_f64<E: de::Error>(self, _: f64) -> Result<Tristate, E> {
                Ok(Tristate::SystemDefault)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Tristate, E> {
                Ok(match v.trim().to_ascii_lowercase().as_str() {
                    "enabled" | "on" | "true" | "1" => Tristate::Enabled,
                    "disabled" | "off" | "false" | "2" => Tristate::Disabled,
                    _ => Tristate::SystemDefault,
                })
            }

            fn visit_unit<E: de::Error>(self) -> Result<Tristate, E> {
                Ok(Tristate::SystemDefault)
            }

            fn visit_none<E: de::Error>(self) -> Result<Tristate, E> {
                Ok(Tristate::SystemDefault)
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Tristate, D::Error> {
                d.deserialize_any(self)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Tristate, A::Error> {
                while seq.next_element::<IgnoredAny>()?.is_some() {}
                Ok(Tristate::SystemDefault)
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Tristate, A::Error> {
                while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
                Ok(Tristate::SystemDefault)
            }
        }

        deserializer.deserialize_any(TristateVisitor)
    }
}

// =============================================================================
// User Agent
// =============================================================================

pub const DEFAULT_USER_AGENT: &str = "PrivacyBrowser/1.0";

/// Identity string presented to web servers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAgent {
    /// Whatever the rendering engine sends by itself
    EngineDefault,
    Custom(String),
}

impl UserAgent {
    /// String handed to the rendering surface; empty selects the engine's own.
    pub fn as_applied(&self) -> &str {
        match self {
            UserAgent::EngineDefault => "",
            UserAgent::Custom(ua) => ua,
        }
    }
}

impl Default for UserAgent {
    fn default() -> Self {
        UserAgent::Custom(DEFAULT_USER_AGENT.to_string())
    }
}

// =============================================================================
// Global Defaults
// =============================================================================

/// Browser-wide settings consulted whenever a record defers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalDefaults {
    pub javascript: bool,
    pub first_party_cookies: bool,
    pub third_party_cookies: bool,
    pub dom_storage: bool,
    pub form_data: bool,
    pub easylist: bool,
    pub easyprivacy: bool,
    pub fanboys_annoyance: bool,
    pub fanboys_social: bool,
    pub ultraprivacy: bool,
    pub block_all_third_party: bool,
    pub user_agent: UserAgent,
    /// Percent
    pub font_size: u32,
    pub swipe_to_refresh: bool,
    pub night_mode: bool,
    pub display_images: bool,
}

impl Default for GlobalDefaults {
    fn default() -> Self {
        Self {
            javascript: false,
            first_party_cookies: false,
            third_party_cookies: false,
            dom_storage: false,
            form_data: false,
            easylist: true,
            easyprivacy: true,
            fanboys_annoyance: true,
            fanboys_social: true,
            ultraprivacy: true,
            block_all_third_party: false,
            user_agent: UserAgent::default(),
            font_size: 100,
            swipe_to_refresh: true,
            night_mode: false,
            display_images: true,
        }
    }
}

// =============================================================================
// Domain Policy Record
// =============================================================================

/// Per-domain override, keyed by `example.com` or `*.example.com`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainPolicyRecord {
    pub domain: String,
    pub javascript: Tristate,
    pub first_party_cookies: Tristate,
    pub third_party_cookies: Tristate,
    pub dom_storage: Tristate,
    pub form_data: Tristate,
    pub easylist: Tristate,
    pub easyprivacy: Tristate,
    pub fanboys_annoyance: Tristate,
    pub fanboys_social: Tristate,
    pub ultraprivacy: Tristate,
    pub block_all_third_party: Tristate,
    /// `None` defers to the global user agent
    pub user_agent: Option<UserAgent>,
    /// Percent; 0 defers to the global font size
    pub font_size: u32,
    pub swipe_to_refresh: Tristate,
    pub night_mode: Tristate,
    pub display_images: Tristate,
    pub pins: Pins,
}

impl DomainPolicyRecord {
    /// A record that overrides nothing.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }
}

// =============================================================================
// Effective Policy
// =============================================================================

/// Fully resolved settings for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectivePolicy {
    /// Host this policy was resolved for, if any
    pub host: Option<String>,
    /// Key of the record that supplied overrides ("custom settings applied")
    pub source: Option<String>,
    pub javascript: bool,
    pub first_party_cookies: bool,
    pub third_party_cookies: bool,
    pub dom_storage: bool,
    pub form_data: bool,
    pub easylist: bool,
    pub easyprivacy: bool,
    pub fanboys_annoyance: bool,
    pub fanboys_social: bool,
    pub ultraprivacy: bool,
    pub block_all_third_party: bool,
    pub user_agent: UserAgent,
    pub font_size: u32,
    pub swipe_to_refresh: bool,
    pub night_mode: bool,
    pub display_images: bool,
    pub pins: Pins,
}

impl EffectivePolicy {
    /// Policy for a document with no matching record.
    pub fn from_defaults(defaults: &GlobalDefaults) -> Self {
        let mut policy = Self {
            host: None,
            source: None,
            javascript: defaults.javascript,
            first_party_cookies: defaults.first_party_cookies,
            third_party_cookies: defaults.third_party_cookies,
            dom_storage: defaults.dom_storage,
            form_data: defaults.form_data,
            easylist: defaults.easylist,
            easyprivacy: defaults.easyprivacy,
            fanboys_annoyance: defaults.fanboys_annoyance,
            fanboys_social: defaults.fanboys_social,
            ultraprivacy: defaults.ultraprivacy,
            block_all_third_party: defaults.block_all_third_party,
            user_agent: defaults.user_agent.clone(),
            font_size: defaults.font_size,
            swipe_to_refresh: defaults.swipe_to_refresh,
            night_mode: defaults.night_mode,
            display_images: defaults.display_images,
            pins: Pins::default(),
        };
        policy.enforce_list_exclusion();
        policy
    }

    /// Merge `record` over `defaults`, field by field.
    pub fn from_record(record: &DomainPolicyRecord, defaults: &GlobalDefaults) -> Self {
        let mut policy = Self {
            host: None,
            source: Some(record.domain.clone()),
            javascript: record.javascript.resolve(defaults.javascript),
            first_party_cookies: record.first_party_cookies.resolve(defaults.first_party_cookies),
            third_party_cookies: record.third_party_cookies.resolve(defaults.third_party_cookies),
            dom_storage: record.dom_storage.resolve(defaults.dom_storage),
            form_data: record.form_data.resolve(defaults.form_data),
            easylist: record.easylist.resolve(defaults.easylist),
            easyprivacy: record.easyprivacy.resolve(defaults.easyprivacy),
            fanboys_annoyance: record.fanboys_annoyance.resolve(defaults.fanboys_annoyance),
            fanboys_social: record.fanboys_social.resolve(defaults.fanboys_social),
            ultraprivacy: record.ultraprivacy.resolve(defaults.ultraprivacy),
            block_all_third_party: record.block_all_third_party.resolve(defaults.block_all_third_party),
            user_agent: record.user_agent.clone().unwrap_or_else(|| defaults.user_agent.clone()),
            font_size: if record.font_size == 0 { defaults.font_size } else { record.font_size },
            swipe_to_refresh: record.swipe_to_refresh.resolve(defaults.swipe_to_refresh),
            night_mode: record.night_mode.resolve(defaults.night_mode),
            display_images: record.display_images.resolve(defaults.display_images),
            pins: record.pins.clone(),
        };
        policy.enforce_list_exclusion();
        policy
    }

    /// Whether a record (rather than defaults alone) shaped this policy.
    pub fn has_custom_settings(&self) -> bool {
        self.source.is_some()
    }

    pub fn is_list_enabled(&self, id: ListId) -> bool {
        match id {
            ListId::EasyList => self.easylist,
            ListId::EasyPrivacy => self.easyprivacy,
            ListId::FanboysAnnoyance => self.fanboys_annoyance,
            ListId::FanboysSocial => self.fanboys_social,
            ListId::UltraPrivacy => self.ultraprivacy,
        }
    }

    /// Toggle a list on this document.
    ///
    /// Enabling the annoyance list switches the social list off, and the
    /// social list cannot be enabled while the annoyance list is on.
    /// Returns the list's resulting state.
    pub fn set_blocklist(&mut self, id: ListId, enabled: bool) -> bool {
        match id {
            ListId::EasyList => self.easylist = enabled,
            ListId::EasyPrivacy => self.easyprivacy = enabled,
            ListId::UltraPrivacy => self.ultraprivacy = enabled,
            ListId::FanboysAnnoyance => self.fanboys_annoyance = enabled,
            ListId::FanboysSocial => {
                if enabled && self.fanboys_annoyance {
                    log::debug!("{} stays off while {} is on", id, ListId::FanboysAnnoyance);
                }
                self.fanboys_social = enabled;
            }
        }
        self.enforce_list_exclusion();
        self.is_list_enabled(id)
    }

    fn enforce_list_exclusion(&mut self) {
        if self.fanboys_annoyance {
            self.fanboys_social = false;
        }
    }

    /// Push this snapshot into the rendering surface.
    pub fn apply_to<S: RenderingSurface + ?Sized>(&self, surface: &mut S) {
        surface.set_javascript_enabled(self.javascript);
        surface.set_first_party_cookies(self.first_party_cookies);
        surface.set_third_party_cookies(self.third_party_cookies);
        surface.set_dom_storage_enabled(self.dom_storage);
        surface.set_form_data_enabled(self.form_data);
        surface.set_images_enabled(self.display_images);
        surface.set_user_agent(self.user_agent.as_applied());
        surface.set_text_zoom(self.font_size);
        surface.set_swipe_to_refresh(self.swipe_to_refresh);
        surface.set_night_mode(self.night_mode);
    }
}
