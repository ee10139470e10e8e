//! Session orchestration for a produce self-checkout kiosk: a camera
//! identifies the item, a serial scale weighs it, and the two readings
//! become a priced bill that is appended to a ledger and rendered as a
//! receipt image.

pub mod camera;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod recorder;
pub mod sensor;
pub mod session;

pub use camera::{Frame, FrameSource, StillFrameSource};
pub use catalog::PriceCatalog;
pub use classifier::{Classification, Classifier, FixedClassifier};
pub use config::KioskConfig;
pub use feed::{FeedController, FeedHandle};
pub use models::Bill;
pub use recorder::{BillRecorder, BillSink};
pub use sensor::{SensorPort, SerialSensorPort, WeightSample, WeightSampler};
pub use session::{
    visible_actions, Action, FinalizeOutcome, KioskController, KioskEvent, SessionSnapshot,
    SessionStatus, StepOutcome,
};
