use chrono::{DateTime, Datelike, TimeZone, Utc};
use chrono_tz::Tz;
use time::{OffsetDateTime, UtcOffset};

use crate::domain::calendar::YearMonth;

pub fn localized_datetime(time: OffsetDateTime, tz: Tz) -> DateTime<Tz> {
    let utc = time.to_offset(UtcOffset::UTC);
    let seconds = utc.unix_timestamp();
    let datetime_utc = DateTime::<Utc>::from_timestamp(seconds, utc.nanosecond())
        .or_else(|| DateTime::<Utc>::from_timestamp(seconds, 0))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    tz.from_utc_datetime(&datetime_utc.naive_utc())
}

/// Calendar month containing `time` as seen from `tz`.
pub fn localized_year_month(time: OffsetDateTime, tz: Tz) -> YearMonth {
    let localized = localized_datetime(time, tz);
    YearMonth {
        year: localized.year(),
        month: u8::try_from(localized.month0()).unwrap_or(0),
    }
}
