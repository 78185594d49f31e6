pub mod tracking;
pub mod writer;

pub use tracking::{TrackingWriter, build_event};
pub use writer::{
    Capability, Connection, Handler, ResponseBuffer, ResponseWriter, TakenOverConnection,
    WriterError,
};
