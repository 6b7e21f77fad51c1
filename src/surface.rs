use std::sync::Arc;

use parking_lot::RwLock;

/// Reports the size the drawing is displayed at, in physical pixels.
pub trait DisplaySurface: Send + Sync {
    fn display_size(&self) -> (u32, u32);
}

/// A display that never changes size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticSurface {
    pub width: u32,
    pub height: u32,
}

impl StaticSurface {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl DisplaySurface for StaticSurface {
    fn display_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Display size written by the window event handler and read at render
/// time.
#[derive(Debug)]
pub struct SharedSurface {
    size: RwLock<(u32, u32)>,
}

impl SharedSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: RwLock::new((width, height)),
        }
    }

    /// Zero sizes are kept: a minimized window renders nothing.
    pub fn update(&self, width: u32, height: u32) {
        *self.size.write() = (width, height);
    }
}

impl DisplaySurface for SharedSurface {
    fn display_size(&self) -> (u32, u32) {
        *self.size.read()
    }
}

impl<T> DisplaySurface for Arc<T>
where
    T: DisplaySurface + ?Sized,
{
    fn display_size(&self) -> (u32, u32) {
        (**self).display_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_surface_sees_updates_through_clones() {
        let surface = Arc::new(SharedSurface::new(640, 480));
        let reader: Arc<dyn DisplaySurface> = surface.clone();
        assert_eq!(reader.display_size(), (640, 480));
        surface.update(1024, 0);
        assert_eq!(reader.display_size(), (1024, 0));
    }

    #[test]
    fn static_surface_reports_its_size() {
        assert_eq!(StaticSurface::new(3, 4).display_size(), (3, 4));
    }
}
