pub mod mock;
pub mod yahoo;

pub use mock::MockProvider;
pub use yahoo::YahooProvider;
