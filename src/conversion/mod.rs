pub mod builder;

pub use builder::{
    ConversionRequestBuilder,
    ConversionTrigger,
};
