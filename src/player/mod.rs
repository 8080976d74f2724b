pub mod mpv;

pub use mpv::MpvHandle;
