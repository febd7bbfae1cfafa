//! 星座推导：出生日期 → 十二星座（纯函数）

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// 十二星座
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZodiacSign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pisces,
}

impl ZodiacSign {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aries => "Aries",
            Self::Taurus => "Taurus",
            Self::Gemini => "Gemini",
            Self::Cancer => "Cancer",
            Self::Leo => "Leo",
            Self::Virgo => "Virgo",
            Self::Libra => "Libra",
            Self::Scorpio => "Scorpio",
            Self::Sagittarius => "Sagittarius",
            Self::Capricorn => "Capricorn",
            Self::Aquarius => "Aquarius",
            Self::Pisces => "Pisces",
        }
    }
}

impl fmt::Display for ZodiacSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 出生日期（YYYY-MM-DD）→ 星座；空串或无法解析时默认 Aries
pub fn zodiac_sign(birth_date: &str) -> ZodiacSign {
    let Ok(date) = NaiveDate::parse_from_str(birth_date.trim(), "%Y-%m-%d") else {
        return ZodiacSign::Aries;
    };
    sign_for(date.month(), date.day())
}

/// 十二个闭区间；Capricorn 跨年末
fn sign_for(m: u32, d: u32) -> ZodiacSign {
    use ZodiacSign::*;
    match (m, d) {
        (3, 21..) | (4, ..=19) => Aries,
        (4, 20..) | (5, ..=20) => Taurus,
        (5, 21..) | (6, ..=20) => Gemini,
        (6, 21..) | (7, ..=22) => Cancer,
        (7, 23..) | (8, ..=22) => Leo,
        (8, 23..) | (9, ..=22) => Virgo,
        (9, 23..) | (10, ..=22) => Libra,
        (10, 23..) | (11, ..=21) => Scorpio,
        (11, 22..) | (12, ..=21) => Sagittarius,
        (12, 22..) | (1, ..=19) => Capricorn,
        (1, 20..) | (2, ..=18) => Aquarius,
        _ => Pisces,
    }
}

/// sign+day 的确定性种子（djb2 变体，非加密；目的是请求可复现，不是安全）
pub fn daily_seed(sign: ZodiacSign, day: NaiveDate) -> u32 {
    let key = format!("{}_{}", sign, day.format("%Y-%m-%d"));
    key.bytes()
        .fold(5381u32, |h, b| h.wrapping_mul(33).wrapping_add(b as u32))
}
