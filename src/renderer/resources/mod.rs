/// Scoped-ownership wrappers around the GPU objects the demo creates.
/// Every wrapper releases its handle on drop, on every exit path.

pub mod buffer;
pub mod image;
pub mod mesh;
pub mod shader;
pub mod texture;
