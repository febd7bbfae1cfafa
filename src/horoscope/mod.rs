//! 星座层：星座推导（纯函数）与每日运势服务

pub mod service;
pub mod zodiac;

pub use service::{
    HoroscopePayload, HoroscopeRecord, HoroscopeService, Ratings, HOROSCOPE_NAMESPACE,
};
pub use zodiac::{daily_seed, zodiac_sign, ZodiacSign};
