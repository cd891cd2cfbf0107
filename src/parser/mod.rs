pub mod dom;
pub mod extract;
pub mod format;
pub mod pattern;
pub mod text;

use crate::error::ParseError;
use extract::Record;
use pattern::Pattern;

/// bytes → tree → records. The tree is dropped before returning.
///
/// `charset` is the transport's declared encoding, if any; UTF-8 otherwise.
pub fn process_page(
    bytes: &[u8],
    charset: Option<&str>,
    pattern: &Pattern,
) -> Result<Vec<Record>, ParseError> {
    let root = dom::parse_with_charset(bytes, charset)?;
    Ok(extract::extract(&root, pattern).collect())
}
