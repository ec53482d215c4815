//! Bidirectional mapping between encoding names and numeric code page ids
//!
//! Name lookups fold ASCII case, then try the literal alias table, then the
//! structural pattern families in a fixed order:
//!
//! | Pattern         | Id                                                   |
//! |-----------------|------------------------------------------------------|
//! | `cp###`         | `###`, except `cp1025` which is 21025                |
//! | `x-cp###`       | `###`                                                |
//! | `ibm###`        | `###`, or `### + 20000` for a fixed set of EBCDIC ids |
//! | `windows-###`   | `###`                                                |
//! | `iso-8859-###`  | `### + 28590`                                        |
//!
//! The reverse direction is a sorted literal table. Ids without an entry have
//! no printable name, which is not an error.
//!
//! The whole table is constant data, so there is nothing to initialize before
//! concurrent use.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::{Error, Result, Validation};

/// Case-insensitive encoding identifier such as `utf-8` or `windows-1252`.
///
/// Names are stored ASCII-lowercased. Non-ASCII bytes pass through unchanged,
/// so two names differing only in non-ASCII case compare unequal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncodingName(Cow<'static, str>);

impl EncodingName {
    /// Create a name, folding ASCII letters to lowercase
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidInput(
                "encoding name must not be empty".to_string(),
            ));
        }
        Ok(Self(Cow::Owned(name.to_ascii_lowercase())))
    }

    /// Take ownership of a non-empty name, folding it in place.
    pub(crate) fn from_owned(mut name: String) -> Self {
        debug_assert!(!name.is_empty());
        name.make_ascii_lowercase();
        Self(Cow::Owned(name))
    }

    /// Wrap a name that is already lowercase.
    pub(crate) const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// The lowercased name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for `utf-8` and its `utf8` spelling
    pub fn is_utf8(&self) -> bool {
        matches!(self.as_str(), "utf-8" | "utf8")
    }

    /// True for every `utf-16` / `utf16` spelling, with or without endianness
    pub fn is_utf16(&self) -> bool {
        self.as_str().starts_with("utf-16") || self.as_str().starts_with("utf16")
    }

    /// True for `ascii` and `us-ascii`
    pub fn is_ascii(&self) -> bool {
        matches!(self.as_str(), "ascii" | "us-ascii")
    }

    /// Byte order mark for this encoding, if it resolves to one that has one
    pub fn bom(&self) -> Option<&'static [u8]> {
        NameTable::global()
            .name_to_id(self.as_str())
            .ok()
            .and_then(CodePageId::bom)
    }
}

impl fmt::Display for EncodingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EncodingName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for EncodingName {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl AsRef<str> for EncodingName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for EncodingName {
    fn eq(&self, other: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(other)
    }
}

impl PartialEq<&str> for EncodingName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str().eq_ignore_ascii_case(other)
    }
}

impl Serialize for EncodingName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Numeric identifier of a platform code page. Zero is never a valid id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CodePageId(u32);

impl CodePageId {
    /// UTF-7
    pub const UTF7: Self = Self(65000);
    /// UTF-8
    pub const UTF8: Self = Self(65001);
    /// UTF-16 little endian
    pub const UTF16LE: Self = Self(1200);
    /// UTF-16 big endian
    pub const UTF16BE: Self = Self(1201);
    /// UTF-32 little endian
    pub const UTF32LE: Self = Self(12000);
    /// UTF-32 big endian
    pub const UTF32BE: Self = Self(12001);
    /// GB18030
    pub const GB18030: Self = Self(54936);
    /// US-ASCII
    pub const US_ASCII: Self = Self(20127);

    /// Wrap a raw id, rejecting zero
    pub const fn new(id: u32) -> Option<Self> {
        if id == 0 { None } else { Some(Self(id)) }
    }

    /// The raw id
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Byte order mark for the Unicode code pages
    pub fn bom(self) -> Option<&'static [u8]> {
        match self {
            Self::UTF8 => Some(&[0xEF, 0xBB, 0xBF]),
            Self::UTF16LE => Some(&[0xFF, 0xFE]),
            Self::UTF16BE => Some(&[0xFE, 0xFF]),
            Self::UTF32LE => Some(&[0xFF, 0xFE, 0x00, 0x00]),
            Self::UTF32BE => Some(&[0x00, 0x00, 0xFE, 0xFF]),
            _ => None,
        }
    }

    /// How strictly input in this code page may be validated
    pub fn validation_policy(self) -> ValidationPolicy {
        ValidationPolicy::for_code_page(self)
    }
}

impl fmt::Display for CodePageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-code-page override of the caller's requested validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValidationPolicy {
    /// Strict validation rejects valid text for these code pages; never use it
    AlwaysPermissive,
    /// Only the strict flag is honoured; any other requested option is dropped
    StrictOnly,
    /// The caller's request is used unchanged
    Inherit,
}

impl ValidationPolicy {
    /// Policy for a code page. ISO-2022, ISCII, UTF-7 and the symbol code
    /// page are always permissive; UTF-8 and GB18030 keep only the strict flag.
    pub fn for_code_page(id: CodePageId) -> Self {
        match id.get() {
            42 | 50220 | 50221 | 50222 | 50225 | 50227 | 50229 | 65000 => Self::AlwaysPermissive,
            57002..=57011 => Self::AlwaysPermissive,
            65001 | 54936 => Self::StrictOnly,
            _ => Self::Inherit,
        }
    }

    /// Effective validation for a caller request
    pub fn apply(self, requested: Validation) -> Validation {
        match self {
            Self::AlwaysPermissive => Validation::Permissive,
            Self::StrictOnly | Self::Inherit => requested,
        }
    }

    /// Effective platform flag word for a caller request, where `strict_flag`
    /// is the platform's "fail on invalid characters" bit.
    pub fn apply_flags(self, requested: u32, strict_flag: u32) -> u32 {
        match self {
            Self::AlwaysPermissive => 0,
            Self::StrictOnly => requested & strict_flag,
            Self::Inherit => requested,
        }
    }
}

enum Spelling {
    /// Canonical spelling followed by its alternates
    Exact(&'static [&'static str]),
    /// Any name starting with this prefix, e.g. `gb2312-80`
    Prefix(&'static str),
}

struct Alias {
    spelling: Spelling,
    id: u32,
}

impl Alias {
    const fn exact(names: &'static [&'static str], id: u32) -> Self {
        Self {
            spelling: Spelling::Exact(names),
            id,
        }
    }

    const fn prefix(prefix: &'static str, id: u32) -> Self {
        Self {
            spelling: Spelling::Prefix(prefix),
            id,
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self.spelling {
            Spelling::Exact(names) => names.contains(&name),
            Spelling::Prefix(prefix) => name.starts_with(prefix),
        }
    }
}

struct PatternFamily {
    prefix: &'static str,
    map: fn(u32) -> Option<u32>,
}

impl PatternFamily {
    fn resolve(&self, name: &str) -> Option<u32> {
        let digits = name.strip_prefix(self.prefix)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        (self.map)(digits.parse().ok()?)
    }
}

fn map_cp(n: u32) -> Option<u32> {
    Some(if n == 1025 { 21025 } else { n })
}

fn map_identity(n: u32) -> Option<u32> {
    Some(n)
}

fn map_ibm(n: u32) -> Option<u32> {
    match n {
        273 | 277 | 278 | 280 | 284 | 285 | 290 | 297 | 420 | 423 | 424 | 871 | 880 | 905
        | 924 => Some(n + 20000),
        _ => Some(n),
    }
}

fn map_iso_8859(n: u32) -> Option<u32> {
    n.checked_add(28590)
}

const PATTERNS: &[PatternFamily] = &[
    PatternFamily {
        prefix: "cp",
        map: map_cp,
    },
    PatternFamily {
        prefix: "x-cp",
        map: map_identity,
    },
    PatternFamily {
        prefix: "ibm",
        map: map_ibm,
    },
    PatternFamily {
        prefix: "windows-",
        map: map_identity,
    },
    PatternFamily {
        prefix: "iso-8859-",
        map: map_iso_8859,
    },
];

const ALIASES: &[Alias] = &[
    Alias::exact(&["asmo-708"], 708),
    Alias::exact(&["dos-720"], 720),
    Alias::exact(&["dos-862"], 862),
    Alias::exact(&["shift_jis", "shift-jis", "sjis"], 932),
    Alias::prefix("gb2312", 936),
    Alias::exact(&["ks_c_5601-1987"], 949),
    Alias::prefix("big5", 950),
    Alias::exact(&["utf16", "utf-16", "utf-16le", "utf16le"], 1200),
    Alias::exact(&["unicodefffe", "utf-16be", "utf16be"], 1201),
    Alias::exact(&["johab"], 1361),
    Alias::exact(&["macintosh", "macroman"], 10000),
    Alias::exact(&["x-mac-japanese"], 10001),
    Alias::exact(&["x-mac-chinesetrad"], 10002),
    Alias::exact(&["x-mac-korean"], 10003),
    Alias::exact(&["x-mac-arabic", "macarabic"], 10004),
    Alias::exact(&["x-mac-hebrew", "machebrew"], 10005),
    Alias::exact(&["x-mac-greek", "macgreek"], 10006),
    Alias::exact(&["x-mac-cyrillic", "maccyrillic"], 10007),
    Alias::exact(&["x-mac-chinesesimp"], 10008),
    Alias::exact(&["x-mac-romanian", "macromania"], 10010),
    Alias::exact(&["x-mac-ukrainian", "macukraine"], 10017),
    Alias::exact(&["x-mac-thai", "macthai"], 10021),
    Alias::exact(&["x-mac-ce"], 10029),
    Alias::exact(&["x-mac-icelandic", "maciceland"], 10079),
    Alias::exact(&["x-mac-turkish", "macturkish"], 10081),
    Alias::exact(&["x-mac-croatian", "maccroatian"], 10082),
    Alias::exact(&["utf32", "utf-32", "utf-32le", "utf32le"], 12000),
    Alias::exact(&["utf-32be", "utf32be"], 12001),
    Alias::exact(&["x-chinese_cns"], 20000),
    Alias::exact(&["x_chinese-eten"], 20002),
    Alias::exact(&["x-ia5"], 20105),
    Alias::exact(&["x-ia5-german"], 20106),
    Alias::exact(&["x-ia5-swedish"], 20107),
    Alias::exact(&["x-ia5-norwegian"], 20108),
    Alias::exact(&["ascii", "us-ascii"], 20127),
    Alias::exact(&["x-ebcdic-koreanextended"], 20833),
    Alias::exact(&["ibm-thai"], 20838),
    Alias::exact(&["koi8-r"], 20866),
    Alias::exact(&["euc-jp"], 20932),
    Alias::exact(&["koi8-u"], 21866),
    Alias::exact(&["x-europa"], 29001),
    Alias::exact(&["iso-8859-8-i"], 38598),
    Alias::exact(&["iso-2022-jp"], 50222),
    Alias::exact(&["csiso2022jp"], 50221),
    Alias::exact(&["iso-2022-kr"], 50225),
    Alias::exact(&["euc-cn"], 51936),
    Alias::exact(&["euc-kr"], 51949),
    Alias::exact(&["hz-gb-2312"], 52936),
    Alias::exact(&["gb18030"], 54936),
    Alias::exact(&["x-iscii-de"], 57002),
    Alias::exact(&["x-iscii-be"], 57003),
    Alias::exact(&["x-iscii-ta"], 57004),
    Alias::exact(&["x-iscii-te"], 57005),
    Alias::exact(&["x-iscii-as"], 57006),
    Alias::exact(&["x-iscii-or"], 57007),
    Alias::exact(&["x-iscii-ka"], 57008),
    Alias::exact(&["x-iscii-ma"], 57009),
    Alias::exact(&["x-iscii-gu"], 57010),
    Alias::exact(&["x-iscii-pa"], 57011),
    Alias::exact(&["utf-7", "utf7"], 65000),
    Alias::exact(&["utf-8", "utf8"], 65001),
];

// Sorted by id; looked up by binary search.
const KNOWN: &[(u32, &str)] = &[
    (37, "ibm037"),
    (437, "ibm437"),
    (500, "ibm500"),
    (708, "asmo-708"),
    (720, "dos-720"),
    (737, "ibm737"),
    (775, "ibm775"),
    (850, "ibm850"),
    (852, "ibm852"),
    (855, "ibm855"),
    (857, "ibm857"),
    (858, "ibm00858"),
    (860, "ibm860"),
    (861, "ibm861"),
    (862, "dos-862"),
    (863, "ibm863"),
    (864, "ibm864"),
    (865, "ibm865"),
    (866, "cp866"),
    (869, "ibm869"),
    (870, "ibm870"),
    (874, "windows-874"),
    (875, "cp875"),
    (932, "shift_jis"),
    (936, "gb2312"),
    (949, "ks_c_5601-1987"),
    (950, "big5"),
    (1026, "ibm1026"),
    (1047, "ibm01047"),
    (1140, "ibm01140"),
    (1141, "ibm01141"),
    (1142, "ibm01142"),
    (1143, "ibm01143"),
    (1144, "ibm01144"),
    (1145, "ibm01145"),
    (1146, "ibm01146"),
    (1147, "ibm01147"),
    (1148, "ibm01148"),
    (1149, "ibm01149"),
    (1200, "utf-16le"),
    (1201, "utf-16be"),
    (1250, "windows-1250"),
    (1251, "windows-1251"),
    (1252, "windows-1252"),
    (1253, "windows-1253"),
    (1254, "windows-1254"),
    (1255, "windows-1255"),
    (1256, "windows-1256"),
    (1257, "windows-1257"),
    (1258, "windows-1258"),
    (1361, "johab"),
    (10000, "macintosh"),
    (10001, "x-mac-japanese"),
    (10002, "x-mac-chinesetrad"),
    (10003, "x-mac-korean"),
    (10004, "x-mac-arabic"),
    (10005, "x-mac-hebrew"),
    (10006, "x-mac-greek"),
    (10007, "x-mac-cyrillic"),
    (10008, "x-mac-chinesesimp"),
    (10010, "x-mac-romanian"),
    (10017, "x-mac-ukrainian"),
    (10021, "x-mac-thai"),
    (10029, "x-mac-ce"),
    (10079, "x-mac-icelandic"),
    (10081, "x-mac-turkish"),
    (10082, "x-mac-croatian"),
    (12000, "utf-32le"),
    (12001, "utf-32be"),
    (20000, "x-chinese_cns"),
    (20001, "x-cp20001"),
    (20002, "x_chinese-eten"),
    (20003, "x-cp20003"),
    (20004, "x-cp20004"),
    (20005, "x-cp20005"),
    (20105, "x-ia5"),
    (20106, "x-ia5-german"),
    (20107, "x-ia5-swedish"),
    (20108, "x-ia5-norwegian"),
    (20127, "us-ascii"),
    (20261, "x-cp20261"),
    (20269, "x-cp20269"),
    (20273, "ibm273"),
    (20277, "ibm277"),
    (20278, "ibm278"),
    (20280, "ibm280"),
    (20284, "ibm284"),
    (20285, "ibm285"),
    (20290, "ibm290"),
    (20297, "ibm297"),
    (20420, "ibm420"),
    (20423, "ibm423"),
    (20424, "ibm424"),
    (20833, "x-ebcdic-koreanextended"),
    (20838, "ibm-thai"),
    (20866, "koi8-r"),
    (20871, "ibm871"),
    (20880, "ibm880"),
    (20905, "ibm295"),
    (20924, "ibm00924"),
    (20932, "euc-jp"),
    (20936, "x-cp20936"),
    (20949, "x-cp20949"),
    (21025, "cp1025"),
    (21866, "koi8-u"),
    (28591, "iso-8859-1"),
    (28592, "iso-8859-2"),
    (28593, "iso-8859-3"),
    (28594, "iso-8859-4"),
    (28595, "iso-8859-5"),
    (28596, "iso-8859-6"),
    (28597, "iso-8859-7"),
    (28598, "iso-8859-8"),
    (28599, "iso-8859-9"),
    (28603, "iso-8859-13"),
    (28605, "iso-8859-15"),
    (29001, "x-europa"),
    (38598, "iso-8859-8-i"),
    (50220, "iso-2022-jp"),
    (50221, "csiso2022jp"),
    (50222, "iso-2022-jp"),
    (50225, "iso-2022-kr"),
    (50227, "x-cp50227"),
    (51932, "euc-jp"),
    (51936, "euc-cn"),
    (51949, "euc-kr"),
    (52936, "hz-gb-2312"),
    (54936, "gb18030"),
    (57002, "x-iscii-de"),
    (57003, "x-iscii-be"),
    (57004, "x-iscii-ta"),
    (57005, "x-iscii-te"),
    (57006, "x-iscii-as"),
    (57007, "x-iscii-or"),
    (57008, "x-iscii-ka"),
    (57009, "x-iscii-ma"),
    (57010, "x-iscii-gu"),
    (57011, "x-iscii-pa"),
    (65000, "utf-7"),
    (65001, "utf-8"),
];

static STANDARD: NameTable = NameTable::standard();

/// Read-only name ↔ code page table
pub struct NameTable {
    aliases: &'static [Alias],
    patterns: &'static [PatternFamily],
    known: &'static [(u32, &'static str)],
}

impl NameTable {
    /// The standard table
    pub const fn standard() -> Self {
        Self {
            aliases: ALIASES,
            patterns: PATTERNS,
            known: KNOWN,
        }
    }

    /// Process-wide instance of [`NameTable::standard`]
    pub fn global() -> &'static NameTable {
        &STANDARD
    }

    /// Resolve a name to its code page id.
    ///
    /// The first matching literal alias wins, then the pattern families are
    /// tried in order. Names that match nothing fail with
    /// [`Error::UnknownEncoding`]; there is no default id.
    pub fn name_to_id(&self, name: impl AsRef<str>) -> Result<CodePageId> {
        let original = name.as_ref();
        let name = original.to_ascii_lowercase();

        let literal = self
            .aliases
            .iter()
            .find(|alias| alias.matches(&name))
            .map(|alias| alias.id);
        let id = literal.or_else(|| {
            self.patterns
                .iter()
                .find_map(|family| family.resolve(&name))
        });

        id.and_then(CodePageId::new)
            .ok_or_else(|| Error::UnknownEncoding(original.to_string()))
    }

    /// Printable name of a code page, or `None` when the id has no entry
    pub fn id_to_name(&self, id: CodePageId) -> Option<EncodingName> {
        self.known
            .binary_search_by_key(&id.get(), |&(known, _)| known)
            .ok()
            .map(|index| EncodingName::from_static(self.known[index].1))
    }

    /// Every id that has a printable name, in ascending order
    pub fn known(&self) -> impl Iterator<Item = (CodePageId, EncodingName)> + '_ {
        self.known
            .iter()
            .map(|&(id, name)| (CodePageId(id), EncodingName::from_static(name)))
    }
}

impl fmt::Debug for NameTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameTable")
            .field("aliases", &self.aliases.len())
            .field("patterns", &self.patterns.len())
            .field("known", &self.known.len())
            .finish()
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> u32 {
        NameTable::global().name_to_id(name).unwrap().get()
    }

    #[test]
    fn test_pattern_families() {
        assert_eq!(id("cp1025"), 21025);
        assert_eq!(id("cp1252"), 1252);
        assert_eq!(id("ibm420"), 20420);
        assert_eq!(id("ibm037"), 37);
        assert_eq!(id("ibm905"), 20905);
        assert_eq!(id("windows-1251"), 1251);
        assert_eq!(id("iso-8859-5"), 28595);
        assert_eq!(id("x-cp20001"), 20001);
    }

    #[test]
    fn test_literal_aliases() {
        assert_eq!(id("utf8"), 65001);
        assert_eq!(id("UTF-8"), 65001);
        assert_eq!(id("utf16le"), 1200);
        assert_eq!(id("unicodeFFFE"), 1201);
        assert_eq!(id("utf-32"), 12000);
        assert_eq!(id("MacRoman"), 10000);
        assert_eq!(id("ascii"), 20127);
        assert_eq!(id("iso-8859-8-i"), 38598);
        assert_eq!(id("euc-jp"), 20932);
        assert_eq!(id("gb18030"), 54936);
        assert_eq!(id("Shift_JIS"), 932);
    }

    #[test]
    fn test_prefix_aliases() {
        assert_eq!(id("gb2312"), 936);
        assert_eq!(id("gb2312-80"), 936);
        assert_eq!(id("big5-hkscs"), 950);
    }

    #[test]
    fn test_unknown_names_fail() {
        let table = NameTable::global();
        for name in ["bogus-encoding-name", "cp", "cp12a", "ibm", "x-cp", "cp0", "cp99999999999"] {
            assert_eq!(
                table.name_to_id(name),
                Err(Error::UnknownEncoding(name.to_string())),
                "{name}"
            );
        }
    }

    #[test]
    fn test_round_trips() {
        let table = NameTable::global();
        for (name, canonical) in [
            ("utf-8", "utf-8"),
            ("windows-1252", "windows-1252"),
            ("gb18030", "gb18030"),
            ("iso-8859-1", "iso-8859-1"),
            ("cp437", "ibm437"),
            ("shift_jis", "shift_jis"),
        ] {
            let id = table.name_to_id(name).unwrap();
            let back = table.id_to_name(id).unwrap();
            assert_eq!(back.as_str(), canonical);
            assert_eq!(table.name_to_id(back.as_str()).unwrap(), id);
        }
    }

    #[test]
    fn test_reverse_aliasing() {
        let table = NameTable::global();
        let a = table.id_to_name(CodePageId::new(20932).unwrap()).unwrap();
        let b = table.id_to_name(CodePageId::new(51932).unwrap()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "euc-jp");
        assert_eq!(table.id_to_name(CodePageId::new(12345).unwrap()), None);
    }

    #[test]
    fn test_known_table_is_sorted_and_resolvable() {
        let table = NameTable::global();
        let ids: Vec<u32> = table.known().map(|(id, _)| id.get()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        for (_, name) in table.known() {
            assert!(table.name_to_id(name.as_str()).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_encoding_name() {
        assert!(EncodingName::new("").is_err());
        let name = EncodingName::new("UTF-8").unwrap();
        assert_eq!(name.as_str(), "utf-8");
        assert_eq!(name, "Utf-8");
        assert!(name.is_utf8());
        assert!(EncodingName::new("UTF-16BE").unwrap().is_utf16());
        assert_eq!(name.bom(), Some([0xEF, 0xBB, 0xBF].as_slice()));
        assert_eq!(EncodingName::new("windows-1252").unwrap().bom(), None);
    }

    #[test]
    fn test_validation_policy() {
        let policy = |id| CodePageId::new(id).unwrap().validation_policy();
        assert_eq!(policy(50222), ValidationPolicy::AlwaysPermissive);
        assert_eq!(policy(57005), ValidationPolicy::AlwaysPermissive);
        assert_eq!(policy(65000), ValidationPolicy::AlwaysPermissive);
        assert_eq!(policy(65001), ValidationPolicy::StrictOnly);
        assert_eq!(policy(54936), ValidationPolicy::StrictOnly);
        assert_eq!(policy(1252), ValidationPolicy::Inherit);

        assert_eq!(
            ValidationPolicy::AlwaysPermissive.apply(Validation::Strict),
            Validation::Permissive
        );
        assert_eq!(ValidationPolicy::StrictOnly.apply_flags(0x88, 0x08), 0x08);
        assert_eq!(ValidationPolicy::Inherit.apply_flags(0x88, 0x08), 0x88);
        assert_eq!(ValidationPolicy::AlwaysPermissive.apply_flags(0x88, 0x08), 0);
    }
}
