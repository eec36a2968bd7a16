/// An address range claimed by one VRAM user.
///
/// The range is described the way video processor table base registers describe it: a base
/// mask whose low `index_bits` are replaced by the table index. The resulting set of
/// addresses need not be contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    base_mask: u32,
    base_address: u32,
    combined_mask: u32,
    enabled: bool,
}

impl Window {
    /// A disabled window.
    pub const fn new() -> Self {
        Self {
            base_mask: 0,
            base_address: 0,
            combined_mask: 0,
            enabled: false,
        }
    }

    /// Sets the range and enables the window. May be called again to move it.
    pub fn set_mask(&mut self, base_mask: u32, index_bits: u32) {
        let index_mask = u32::MAX.checked_shl(index_bits).unwrap_or(0);
        self.base_mask = base_mask;
        self.base_address = base_mask & index_mask;
        self.combined_mask = !base_mask | index_mask;
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The base mask, if enabled.
    pub fn mask(&self) -> Option<u32> {
        self.enabled.then_some(self.base_mask)
    }

    #[inline]
    pub fn is_inside(&self, address: u32) -> bool {
        self.enabled && (address & self.combined_mask) == self.base_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourteen_bit_table_at_zero() {
        let mut window = Window::new();
        window.set_mask(0x3FFF, 14);

        assert!(window.is_inside(0x0000));
        assert!(window.is_inside(0x3FFF));
        assert!(!window.is_inside(0x4000));
        assert_eq!(window.mask(), Some(0x3FFF));

        window.disable();
        assert!(!window.is_inside(0x3FFF));
        assert!(!window.is_inside(0x4000));
        assert_eq!(window.mask(), None);
    }

    #[test]
    fn new_window_matches_nothing() {
        let window = Window::new();
        assert!(!window.is_enabled());
        assert!(!window.is_inside(0));
        assert_eq!(window, Window::default());
    }

    #[test]
    fn cleared_mask_bits_split_the_range() {
        // Name table at 0x1C00 with 10 index bits, index bit 7 forced low.
        let mut window = Window::new();
        window.set_mask(0x1C00 | 0x37F, 10);
        assert!(window.is_inside(0x1C00));
        assert!(window.is_inside(0x1C7F));
        assert!(!window.is_inside(0x1C80));
        assert!(window.is_inside(0x1F7F));
        assert!(!window.is_inside(0x2000));
        assert!(!window.is_inside(0x11C00));
    }

    #[test]
    fn zero_index_bits_is_a_single_address() {
        let mut window = Window::new();
        window.set_mask(0x0123, 0);
        assert!(window.is_inside(0x0123));
        assert!(!window.is_inside(0x0122));

        window.set_mask(0x1FFFF, 32);
        assert!(window.is_inside(0x1FFFF));
        assert!(!window.is_inside(0x20000));
    }
}
