//! Method masks and handler entry flags.
//!
//! Every handler entry declares the set of HTTP verbs it accepts as a
//! [`MethodMask`] bitset. A request verb is normalised to exactly one bit
//! (HEAD shares the GET bit) and an entry accepts the request when the two
//! masks intersect.

use std::fmt;
use std::ops::BitOr;

use http::Method;

/// Bitset over the verbs the router understands.
///
/// A mask is never empty: the only constructors are the constants below,
/// [`MethodMask::from_bits`] (which rejects zero) and the union of two
/// non-empty masks.
///
/// # Example
///
/// ```rust
/// use feast_router::MethodMask;
/// use http::Method;
///
/// let editable = MethodMask::EDITABLE;
/// assert!(editable.accepts(MethodMask::PUT));
/// assert!(!editable.accepts(MethodMask::GET));
///
/// // HEAD is routed as GET
/// assert_eq!(MethodMask::from_method(&Method::HEAD), Some(MethodMask::GET));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodMask(u8);

impl MethodMask {
    /// GET (and HEAD).
    pub const GET: Self = Self(1);
    /// POST.
    pub const POST: Self = Self(2);
    /// PUT.
    pub const PUT: Self = Self(4);
    /// PATCH.
    pub const PATCH: Self = Self(8);
    /// DELETE.
    pub const DELETE: Self = Self(16);

    /// Read access: GET.
    pub const READABLE: Self = Self::GET;
    /// Creation: POST.
    pub const CREATABLE: Self = Self::POST;
    /// Modification: POST, PUT or PATCH.
    pub const EDITABLE: Self = Self(2 | 4 | 8);
    /// Removal: DELETE.
    pub const DELETABLE: Self = Self::DELETE;
    /// Every supported verb.
    pub const ALL: Self = Self(31);

    const NAMES: [(Self, &'static str); 5] = [
        (Self::GET, "GET"),
        (Self::POST, "POST"),
        (Self::PUT, "PUT"),
        (Self::PATCH, "PATCH"),
        (Self::DELETE, "DELETE"),
    ];

    /// Builds a mask from raw bits.
    ///
    /// Returns `None` for zero or for bits outside [`MethodMask::ALL`].
    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        if bits == 0 || bits & !Self::ALL.0 != 0 {
            None
        } else {
            Some(Self(bits))
        }
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Normalises a request verb to its single mask bit.
    ///
    /// HEAD maps to GET. Verbs outside GET/HEAD/POST/PUT/PATCH/DELETE
    /// return `None`.
    #[must_use]
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET | Method::HEAD => Some(Self::GET),
            Method::POST => Some(Self::POST),
            Method::PUT => Some(Self::PUT),
            Method::PATCH => Some(Self::PATCH),
            Method::DELETE => Some(Self::DELETE),
            _ => None,
        }
    }

    /// Returns the union of both masks.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `true` when the masks share at least one verb.
    #[must_use]
    pub const fn accepts(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns `true` when every verb of `other` is in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Names of the verbs in this mask, in GET, POST, PUT, PATCH, DELETE order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES
            .into_iter()
            .filter(move |(bit, _)| self.contains(*bit))
            .map(|(_, name)| name)
    }
}

impl BitOr for MethodMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Display for MethodMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.names().collect();
        f.write_str(&names.join("|"))
    }
}

/// Per-entry behaviour flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EntryFlags(u16);

impl EntryFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Decode the raw body as JSON and merge it into the argument bag.
    pub const ACCEPT_JSON_BODY: Self = Self(128);
    /// Leave the entry out of the route index.
    pub const HIDDEN: Self = Self(256);

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Returns `true` when every flag of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for EntryFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
