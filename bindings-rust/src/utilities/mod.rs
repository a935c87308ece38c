pub mod serial;
pub mod privacy;
pub mod array;

use itertools::Itertools;
use std::hash::Hash;


/// Drop repeated values, keeping the first occurrence of each in order.
pub fn deduplicate<T: Eq + Hash + Clone>(values: impl IntoIterator<Item=T>) -> Vec<T> {
    values.into_iter().unique().collect()
}

#[doc(hidden)]
pub fn prepend(text: &str) -> impl Fn(crate::Error) -> crate::Error + '_ {
    move |e| format!("{} {}", text, e).into()
}
