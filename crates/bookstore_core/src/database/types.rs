use chrono::NaiveDateTime;
use core::fmt;
use core::str::FromStr;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::sqlite::{Sqlite, SqliteArgumentValue, SqliteTypeInfo, SqliteValueRef};
use sqlx::{Decode, Encode, Type};

/// A [`rust_decimal::Decimal`] constrained to exactly two decimal places.
///
/// Used for both book prices and aggregate ratings. Serializes as a fixed
/// two-decimal string ("1000.00", "4.67") and accepts "500", "500.5" and
/// "500.00" forms alike. SQLite has no NUMERIC column type, so values cross
/// the database boundary as integer hundredths and are rescaled on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal2(Decimal);

impl Decimal2 {
    #[must_use]
    #[inline]
    pub fn from_hundredths(hundredths: i64) -> Self {
        Self(Decimal::new(hundredths, 2))
    }

    /// Builds a value from whole units, e.g. `from_units(1000)` is "1000.00".
    #[must_use]
    #[inline]
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::new(units.saturating_mul(100), 2))
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "Every constructor checks that the two-decimal mantissa fits an i64"
    )]
    #[must_use]
    #[inline]
    pub fn hundredths(self) -> i64 {
        self.0.mantissa() as i64
    }
}

impl TryFrom<Decimal> for Decimal2 {
    type Error = ParseDecimalError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value.scale() > 2 {
            return Err(ParseDecimalError(value.to_string()));
        }
        let mut rescaled = value;
        rescaled.rescale(2);
        i64::try_from(rescaled.mantissa()).map_err(|_| ParseDecimalError(value.to_string()))?;
        Ok(Self(rescaled))
    }
}

impl fmt::Display for Decimal2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Error returned when a value is not a valid two-decimal fixed-point amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid fixed-point value: {0:?}")]
pub struct ParseDecimalError(pub String);

impl FromStr for Decimal2 {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: Decimal = s.parse().map_err(|_| ParseDecimalError(s.to_owned()))?;
        Self::try_from(raw)
    }
}

impl Serialize for Decimal2 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Decimal2 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::try_from(raw).map_err(de::Error::custom)
    }
}

impl Type<Sqlite> for Decimal2 {
    fn type_info() -> SqliteTypeInfo {
        <i64 as Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <i64 as Type<Sqlite>>::compatible(ty)
    }
}

impl<'q> Encode<'q, Sqlite> for Decimal2 {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<SqliteArgumentValue<'q>>,
    ) -> Result<IsNull, BoxDynError> {
        let hundredths = i64::try_from(self.0.mantissa())?;
        <i64 as Encode<'q, Sqlite>>::encode_by_ref(&hundredths, buf)
    }
}

impl<'r> Decode<'r, Sqlite> for Decimal2 {
    fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
        let hundredths = <i64 as Decode<'r, Sqlite>>::decode(value)?;
        Ok(Self::from_hundredths(hundredths))
    }
}

/// A registered user. Identity and session management belong to an external
/// provider; this table only carries what the catalog queries need to join.
#[non_exhaustive]
#[derive(Serialize, Debug, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
}

#[derive(Serialize, Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_staff: bool,
}

impl NewUser {
    #[must_use]
    #[inline]
    pub const fn new(username: String, first_name: String, last_name: String) -> Self {
        Self {
            username,
            first_name,
            last_name,
            is_staff: false,
        }
    }
}

#[non_exhaustive]
#[derive(Serialize, Debug, Deserialize, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BookRecord {
    pub id: i64,
    pub name: String,
    pub price: Decimal2,
    pub author_name: String,
    pub owner: Option<i64>,
    pub rating: Option<Decimal2>,
}

#[derive(Serialize, Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub name: String,
    pub price: Decimal2,
    pub author_name: String,
}

impl NewBook {
    #[must_use]
    #[inline]
    pub const fn new(name: String, price: Decimal2, author_name: String) -> Self {
        Self {
            name,
            price,
            author_name,
        }
    }
}

/// Partial update of a book; absent fields are left untouched.
#[derive(Serialize, Debug, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct BookPatch {
    pub name: Option<String>,
    pub price: Option<Decimal2>,
    pub author_name: Option<String>,
}

/// A per-(user, book) interaction row. At most one exists per pair.
#[non_exhaustive]
#[derive(Serialize, Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RelationRecord {
    pub id: i64,
    pub user: i64,
    pub book: i64,
    #[sqlx(rename = "liked")]
    pub like: bool,
    pub in_bookmarks: bool,
    pub rate: Option<i64>,
    pub created_at: NaiveDateTime,
}

/// Error type shared by all store operations.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A rating outside the allowed 1..=5 set was submitted.
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),

    /// The requester is neither the owner of the book nor staff.
    #[error("operation requires book ownership or staff privileges")]
    Forbidden,

    /// The addressed book does not exist.
    #[error("book not found")]
    NotFound,

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_two_decimals() {
        assert_eq!("1000.00", Decimal2::from_units(1000).to_string());
        assert_eq!("4.67", Decimal2::from_hundredths(467).to_string());
        assert_eq!("0.05", Decimal2::from_hundredths(5).to_string());
        assert_eq!("-12.30", Decimal2::from_hundredths(-1230).to_string());
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(Ok(Decimal2::from_units(500)), "500".parse());
        assert_eq!(Ok(Decimal2::from_hundredths(50050)), "500.5".parse());
        assert_eq!(Ok(Decimal2::from_units(500)), "500.00".parse());
        assert_eq!(Ok(Decimal2::from_hundredths(-99)), "-0.99".parse());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Decimal2>().is_err());
        assert!("1.234".parse::<Decimal2>().is_err());
        assert!("ten".parse::<Decimal2>().is_err());
        assert!("1,50".parse::<Decimal2>().is_err());
    }

    #[test]
    fn test_parse_rejects_amounts_past_hundredths_range() {
        // 92233720368547759.00 needs more hundredths than an i64 column holds.
        assert!("92233720368547759".parse::<Decimal2>().is_err());
        assert!("100000000000000000000000000000".parse::<Decimal2>().is_err());
        assert!("92233720368547758".parse::<Decimal2>().is_ok());
    }

    #[test]
    fn test_serde_round_trip() {
        let price = Decimal2::from_units(1000);
        assert_eq!("\"1000.00\"", serde_json::to_string(&price).unwrap());

        let from_string: Decimal2 = serde_json::from_str("\"500.00\"").unwrap();
        assert_eq!(Decimal2::from_units(500), from_string);
        let from_int: Decimal2 = serde_json::from_str("500").unwrap();
        assert_eq!(Decimal2::from_units(500), from_int);
        let from_float: Decimal2 = serde_json::from_str("4.67").unwrap();
        assert_eq!(Decimal2::from_hundredths(467), from_float);
    }
}
