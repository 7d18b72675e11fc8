pub mod clock;
pub mod dialogue;
pub mod feedback;
pub mod host;
pub mod timeline;
