pub mod cart;
pub mod checkout;
pub mod detection;
pub mod events;
pub mod notify;
pub mod pricing;
pub mod serial;
pub mod settings;
pub mod utils;

pub use cart::CartStore;
pub use checkout::{CheckoutController, CheckoutOutcome};
pub use detection::DetectionController;
pub use events::AppEvent;
pub use settings::Settings;
