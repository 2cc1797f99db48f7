//! Declarative element wrappers.
//!
//! Each wrapper type names the tag it wraps and declares its properties:
//! text found at a relative path, attributes on the element itself, and
//! collections of nested wrappers found anywhere below it. Declarations
//! live in a per-type [`Schema`] registry consulted by
//! [`ActivityElement::get`]; the [`activity_element!`](crate::activity_element)
//! macro also generates typed accessors for them. Nothing is cached: every
//! access queries the tree again.

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::RwLock;

use crate::convert::{Conversion, FromText, Value, convert};
use crate::dom::{Element, Node};
use crate::error::{ReaderError, Result};

/// How one declared property is read.
#[derive(Clone, Copy)]
pub enum PropertyDecl {
    /// Text of the first element at `path`, converted to `kind`.
    Data { path: &'static str, kind: Conversion },
    /// Attribute `key` of the element itself, converted to `kind`.
    Attribute { key: &'static str, kind: Conversion },
    /// Every descendant tagged `tag`, wrapped with that type's schema.
    Descendants {
        tag: &'static str,
        schema: fn() -> &'static Schema,
    },
}

impl PropertyDecl {
    fn same_mapping(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Data { path: a, kind: ka }, Self::Data { path: b, kind: kb }) => a == b && ka == kb,
            (Self::Attribute { key: a, kind: ka }, Self::Attribute { key: b, kind: kb }) => {
                a == b && ka == kb
            }
            (Self::Descendants { tag: a, .. }, Self::Descendants { tag: b, .. }) => a == b,
            _ => false,
        }
    }

    fn resolve<'a>(&self, elem: &'a Element) -> Result<Property<'a>> {
        match *self {
            Self::Data { path, kind } => elem
                .findtext(path)
                .map(|raw| convert(raw, kind))
                .transpose()
                .map(Property::Value),
            Self::Attribute { key, kind } => elem
                .get(key)
                .map(|raw| convert(raw, kind))
                .transpose()
                .map(Property::Value),
            Self::Descendants { tag, schema } => {
                let schema = schema();
                Ok(Property::Elements(
                    elem.descendants_by_tag(tag)
                        .map(|e| DynElement { elem: e, schema })
                        .collect(),
                ))
            }
        }
    }
}

impl fmt::Debug for PropertyDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data { path, kind } => write!(f, "Data({path:?}, {kind})"),
            Self::Attribute { key, kind } => write!(f, "Attribute({key:?}, {kind})"),
            Self::Descendants { tag, .. } => write!(f, "Descendants(<{tag}>)"),
        }
    }
}

/// Property registry for one wrapper type.
///
/// Registration is idempotent: adding a name that is already declared
/// leaves the existing declaration in place.
pub struct Schema {
    tag: &'static str,
    properties: RwLock<BTreeMap<&'static str, PropertyDecl>>,
}

impl Schema {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            properties: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Declare a property read from the text at `path`.
    /// Returns false if `name` was already declared.
    pub fn add_data_property(&self, name: &'static str, path: &'static str, kind: Conversion) -> bool {
        self.register(name, PropertyDecl::Data { path, kind })
    }

    /// Declare a property read from attribute `key`.
    /// Returns false if `name` was already declared.
    pub fn add_attr_property(&self, name: &'static str, key: &'static str, kind: Conversion) -> bool {
        self.register(name, PropertyDecl::Attribute { key, kind })
    }

    /// Declare a collection of `W` wrappers found below the element.
    /// Returns false if `name` was already declared.
    pub fn add_descendant_property<W: ActivityElement>(&self, name: &'static str) -> bool {
        self.register(
            name,
            PropertyDecl::Descendants {
                tag: W::TAG,
                schema: W::schema,
            },
        )
    }

    fn register(&self, name: &'static str, decl: PropertyDecl) -> bool {
        let mut properties = self.properties.write();
        match properties.get(name) {
            Some(existing) => {
                if !existing.same_mapping(&decl) {
                    tracing::warn!(
                        tag = self.tag,
                        property = name,
                        existing = ?existing,
                        ignored = ?decl,
                        "Property already declared; keeping the first declaration"
                    );
                }
                false
            }
            None => {
                tracing::trace!(tag = self.tag, property = name, decl = ?decl, "Registered property");
                properties.insert(name, decl);
                true
            }
        }
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.read().contains_key(name)
    }

    pub fn declaration(&self, name: &str) -> Option<PropertyDecl> {
        self.properties.read().get(name).copied()
    }

    pub fn property_names(&self) -> Vec<&'static str> {
        self.properties.read().keys().copied().collect()
    }

    /// Read property `name` from `elem`.
    pub fn resolve<'a>(&self, elem: &'a Element, name: &str) -> Result<Property<'a>> {
        let decl = self
            .declaration(name)
            .ok_or_else(|| ReaderError::UnknownProperty {
                tag: self.tag,
                name: name.to_string(),
            })?;
        decl.resolve(elem)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("tag", &self.tag)
            .field("properties", &*self.properties.read())
            .finish()
    }
}

/// Result of a dynamic property lookup.
#[derive(Debug, Clone)]
pub enum Property<'a> {
    /// A scalar; `None` when the text node or attribute is absent.
    Value(Option<Value>),
    /// A descendant collection in document order.
    Elements(Vec<DynElement<'a>>),
}

impl<'a> Property<'a> {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => v.as_ref(),
            Self::Elements(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(v) => v,
            Self::Elements(_) => None,
        }
    }

    pub fn into_elements(self) -> Vec<DynElement<'a>> {
        match self {
            Self::Elements(list) => list,
            Self::Value(_) => Vec::new(),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Elements(_))
    }
}

/// An element paired with the schema of the type that declared it,
/// navigable by property name.
#[derive(Clone, Copy)]
pub struct DynElement<'a> {
    elem: &'a Element,
    schema: &'static Schema,
}

impl<'a> DynElement<'a> {
    pub fn element(&self) -> &'a Element {
        self.elem
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn get(&self, name: &str) -> Result<Property<'a>> {
        self.schema.resolve(self.elem, name)
    }
}

impl fmt::Debug for DynElement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynElement")
            .field("tag", &self.schema.tag)
            .finish()
    }
}

/// A typed view over one XML element.
pub trait ActivityElement {
    /// Tag the wrapped element must carry.
    const TAG: &'static str;

    /// Registry of this type's declared properties.
    fn schema() -> &'static Schema;

    fn element(&self) -> &Element;

    /// Read any declared property by name, including properties added to
    /// the schema after this wrapper was created.
    fn get(&self, name: &str) -> Result<Property<'_>> {
        Self::schema().resolve(self.element(), name)
    }

    fn get_data<T: FromText>(&self, path: &str) -> Result<Option<T>> {
        data(self.element(), path)
    }

    fn get_attr<T: FromText>(&self, key: &str) -> Result<Option<T>> {
        attr(self.element(), key)
    }

    fn as_dyn(&self) -> DynElement<'_> {
        DynElement {
            elem: self.element(),
            schema: Self::schema(),
        }
    }
}

/// Wrappers that borrow an element from a parsed tree.
pub trait FromElement<'a>: ActivityElement + Sized {
    /// Wrap without checking the tag.
    fn wrap_unchecked(elem: &'a Element) -> Self;

    /// Wrap `elem`, failing if its tag is not [`ActivityElement::TAG`].
    fn from_element(elem: &'a Element) -> Result<Self> {
        check_tag(elem, Self::TAG)?;
        let _ = Self::schema();
        Ok(Self::wrap_unchecked(elem))
    }

    /// Wrap any tree node, failing if it is not an element.
    fn new(node: &'a Node) -> Result<Self> {
        match node {
            Node::Element(elem) => Self::from_element(elem),
            other => Err(ReaderError::NotAnElement {
                actual: other.kind(),
            }),
        }
    }
}

pub fn check_tag(elem: &Element, expected: &'static str) -> Result<()> {
    if elem.tag() == expected {
        Ok(())
    } else {
        Err(ReaderError::TagMismatch {
            expected,
            actual: elem.tag().to_string(),
        })
    }
}

/// Text at `path` below `elem`, converted; `None` when nothing matches.
pub fn data<T: FromText>(elem: &Element, path: &str) -> Result<Option<T>> {
    elem.findtext(path).map(T::from_text).transpose()
}

/// Attribute `key` of `elem`, converted; `None` when absent.
pub fn attr<T: FromText>(elem: &Element, key: &str) -> Result<Option<T>> {
    elem.get(key).map(T::from_text).transpose()
}

/// Every descendant of `elem` carrying `W::TAG`, wrapped, in document order.
pub fn descendants<'a, W: FromElement<'a>>(elem: &'a Element) -> Vec<W> {
    elem.descendants_by_tag(W::TAG)
        .map(W::wrap_unchecked)
        .collect()
}

/// Declare an element wrapper type.
///
/// ```
/// use activity_reader::activity_element;
///
/// activity_element! {
///     /// A sample reading.
///     pub struct Reading<'a> : "reading" {
///         data { value: f64 = "value" }
///         attrs { unit: String = "unit" }
///     }
/// }
/// ```
///
/// Borrowed wrappers (`struct Name<'a>`) hold a reference into a tree.
/// Root wrappers (`struct Name`) own their [`Document`](crate::dom::Document)
/// and get a `from_document` constructor.
///
/// The generated typed accessors are static mirrors of the declarations
/// the macro registers: they read through [`data`], [`attr`] and
/// [`descendants`] with the same paths and kinds, without a registry
/// lookup. Properties added later through [`Schema`] are reachable only
/// through [`ActivityElement::get`]. Since registration never replaces a
/// declaration, both paths always resolve a name the same way.
#[macro_export]
macro_rules! activity_element {
    (@schema $tag:literal;
        [$($dname:ident : $dty:ty = $dpath:literal),*]
        [$($aname:ident : $aty:ty = $akey:literal),*]
        [$($cname:ident : $cty:ident),*]
    ) => {{
        static SCHEMA: ::std::sync::LazyLock<$crate::element::Schema> =
            ::std::sync::LazyLock::new(|| {
                let schema = $crate::element::Schema::new($tag);
                $(schema.add_data_property(
                    stringify!($dname),
                    $dpath,
                    <$dty as $crate::convert::FromText>::KIND,
                );)*
                $(schema.add_attr_property(
                    stringify!($aname),
                    $akey,
                    <$aty as $crate::convert::FromText>::KIND,
                );)*
                $(schema.add_descendant_property::<$cty<'static>>(stringify!($cname));)*
                schema
            });
        ::std::sync::LazyLock::force(&SCHEMA)
    }};

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident<$lt:lifetime> : $tag:literal {
            $(data { $($dname:ident : $dty:ty = $dpath:literal),* $(,)? })?
            $(attrs { $($aname:ident : $aty:ty = $akey:literal),* $(,)? })?
            $(descendants { $($cname:ident : $cty:ident),* $(,)? })?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        $vis struct $name<$lt> {
            elem: &$lt $crate::dom::Element,
        }

        impl<$lt> $crate::element::ActivityElement for $name<$lt> {
            const TAG: &'static str = $tag;

            fn schema() -> &'static $crate::element::Schema {
                $crate::activity_element!(@schema $tag;
                    [$($($dname : $dty = $dpath),*)?]
                    [$($($aname : $aty = $akey),*)?]
                    [$($($cname : $cty),*)?]
                )
            }

            fn element(&self) -> &$crate::dom::Element {
                self.elem
            }
        }

        impl<$lt> $crate::element::FromElement<$lt> for $name<$lt> {
            fn wrap_unchecked(elem: &$lt $crate::dom::Element) -> Self {
                Self { elem }
            }
        }

        #[allow(dead_code)]
        impl<$lt> $name<$lt> {
            $($(
                #[doc = concat!("Text of `", $dpath, "`, read as `", stringify!($dty), "`.")]
                pub fn $dname(&self) -> $crate::error::Result<Option<$dty>> {
                    $crate::element::data(self.elem, $dpath)
                }
            )*)?
            $($(
                #[doc = concat!("Attribute `", $akey, "`, read as `", stringify!($aty), "`.")]
                pub fn $aname(&self) -> $crate::error::Result<Option<$aty>> {
                    $crate::element::attr(self.elem, $akey)
                }
            )*)?
            $($(
                #[doc = concat!("Every `", stringify!($cty), "` below this element, in document order.")]
                pub fn $cname(&self) -> Vec<$cty<$lt>> {
                    $crate::element::descendants(self.elem)
                }
            )*)?
        }
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $tag:literal {
            $(data { $($dname:ident : $dty:ty = $dpath:literal),* $(,)? })?
            $(attrs { $($aname:ident : $aty:ty = $akey:literal),* $(,)? })?
            $(descendants { $($cname:ident : $cty:ident),* $(,)? })?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            document: $crate::dom::Document,
        }

        impl $crate::element::ActivityElement for $name {
            const TAG: &'static str = $tag;

            fn schema() -> &'static $crate::element::Schema {
                $crate::activity_element!(@schema $tag;
                    [$($($dname : $dty = $dpath),*)?]
                    [$($($aname : $aty = $akey),*)?]
                    [$($($cname : $cty),*)?]
                )
            }

            fn element(&self) -> &$crate::dom::Element {
                self.document.root()
            }
        }

        #[allow(dead_code)]
        impl $name {
            /// Wrap an already parsed (and namespace-stripped) document,
            /// failing if its root element has the wrong tag.
            pub fn from_document(document: $crate::dom::Document) -> $crate::error::Result<Self> {
                $crate::element::check_tag(document.root(), $tag)?;
                let _ = <Self as $crate::element::ActivityElement>::schema();
                Ok(Self { document })
            }

            pub fn document(&self) -> &$crate::dom::Document {
                &self.document
            }

            pub fn into_document(self) -> $crate::dom::Document {
                self.document
            }

            $($(
                #[doc = concat!("Text of `", $dpath, "`, read as `", stringify!($dty), "`.")]
                pub fn $dname(&self) -> $crate::error::Result<Option<$dty>> {
                    $crate::element::data(self.document.root(), $dpath)
                }
            )*)?
            $($(
                #[doc = concat!("Attribute `", $akey, "`, read as `", stringify!($aty), "`.")]
                pub fn $aname(&self) -> $crate::error::Result<Option<$aty>> {
                    $crate::element::attr(self.document.root(), $akey)
                }
            )*)?
            $($(
                #[doc = concat!("Every `", stringify!($cty), "` in the document, in document order.")]
                pub fn $cname(&self) -> Vec<$cty<'_>> {
                    $crate::element::descendants(self.document.root())
                }
            )*)?
        }
    };
}
