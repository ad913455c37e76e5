pub mod mac;
pub mod registry;
pub mod wake;
pub mod wol;
