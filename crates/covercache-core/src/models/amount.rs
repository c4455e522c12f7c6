//! Money fields arrive as JSON numbers from some views and as decimal
//! strings from DRF serializers; both deserialize to `f64`.

use serde::{de, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw {
    Number(f64),
    Text(String),
}

fn parse<E: de::Error>(raw: Raw) -> Result<f64, E> {
    match raw {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| E::custom(format!("invalid amount: {:?}", s))),
    }
}

pub fn flexible<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    parse(Raw::deserialize(deserializer)?)
}

pub fn flexible_opt<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Option::<Raw>::deserialize(deserializer)?.map(parse).transpose()
}
