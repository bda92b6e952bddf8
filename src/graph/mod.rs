//! Blueprint graph model: typed nodes, pins, connections, and the store
//! that keeps them consistent.
//!
//! Everything the compiler consumes lives here. [`GraphStore`] owns the
//! data and enforces the connection invariants; [`types`] holds the plain
//! serializable shapes; [`events`] carries change notifications out to
//! whoever is watching (an editor canvas, a test harness).

pub mod events;
pub mod store;
pub mod types;

pub use events::{CollectingObserver, GraphEvent, GraphObserver, NullObserver};
pub use store::GraphStore;
pub use types::{Connection, GraphPayload, Node, Pin, PinDirection, PinKind, PinRef, Position};
