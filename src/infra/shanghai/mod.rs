mod client;

pub use client::{API_URL, REFERER, ShanghaiTouristClient};
