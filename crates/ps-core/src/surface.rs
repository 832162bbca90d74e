//! Rendering surface seam
//!
//! The engine never renders; it pushes resolved settings into whatever
//! implements [`RenderingSurface`] and answers its resource requests.

/// Settings setters exposed by the rendering engine for one document.
pub trait RenderingSurface {
    fn set_javascript_enabled(&mut self, enabled: bool);
    fn set_first_party_cookies(&mut self, enabled: bool);
    fn set_third_party_cookies(&mut self, enabled: bool);
    fn set_dom_storage_enabled(&mut self, enabled: bool);
    fn set_form_data_enabled(&mut self, enabled: bool);
    fn set_images_enabled(&mut self, enabled: bool);
    /// An empty string selects the engine's own user agent.
    fn set_user_agent(&mut self, user_agent: &str);
    /// Text zoom in percent.
    fn set_text_zoom(&mut self, percent: u32);
    fn set_swipe_to_refresh(&mut self, enabled: bool);
    fn set_night_mode(&mut self, enabled: bool);
}

/// Answer to the surface's per-request interception hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptResponse {
    /// Let the engine fetch the resource.
    Allow,
    /// Hand the engine an empty response instead.
    BlockedEmptyResponse,
}
