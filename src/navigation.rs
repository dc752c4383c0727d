//! Browser location assignment

/// Something that can send the browser to another location
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}
