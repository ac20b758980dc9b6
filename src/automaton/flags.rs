/// Which control subsystems are active.
///
/// Every state admits exactly one combination, see [`StateId::flags`](super::StateId::flags).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flags {
    pub autodrive: bool,
    pub update_compass: bool,
    pub update_gps: bool,
    pub check_position: bool,
    pub moving: bool,
}

impl Flags {
    /// All subsystems off.
    pub const NONE: Flags = Flags {
        autodrive: false,
        update_compass: false,
        update_gps: false,
        check_position: false,
        moving: false,
    };

    /// Flags of a freshly started system: only position checking is on.
    pub const fn initial() -> Flags {
        Flags {
            check_position: true,
            ..Flags::NONE
        }
    }
}
