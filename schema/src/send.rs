//! Send-side property tables.
//!
//! A [`SendTable`] describes how to read every networked field of an object of
//! type `T`. Field access goes through closures bound when the table is built,
//! so the codec never touches the object's memory layout directly.
//!
//! Tables received from a remote peer carry the same structure but no
//! accessors; they are typed over the uninhabited [`Unbound`] marker.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{SchemaError, SchemaResult};
use crate::{ObjectId, PropFlags, PropKind, PropValue, Recipients};

/// Maximum number of elements an array property may declare.
pub const MAX_ARRAY_ELEMENTS: usize = 1023;

/// Reads one value (or one array element) from the source object.
pub type ValueFn<T> = Arc<dyn Fn(&T, usize) -> PropValue + Send + Sync>;
/// Reports the live length of an array property.
pub type LengthFn<T> = Arc<dyn Fn(&T, ObjectId) -> usize + Send + Sync>;
/// Decides whether a nested table is sent, and to whom.
pub type TableProxyFn<T> = Arc<dyn Fn(&T, ObjectId, &mut Recipients) -> bool + Send + Sync>;

/// Object type of tables that only describe structure (e.g. a remote peer's tables).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unbound {}

/// The structural part of a property: everything that crosses the wire.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropDescriptor {
    pub name: String,
    pub kind: PropKind,
    pub flags: PropFlags,
    pub bits: u8,
    pub low: f32,
    pub high: f32,
    pub num_elements: u16,
    /// Nested table name for `DataTable`, excluded table name for `EXCLUDE`.
    pub table_name: Option<String>,
}

impl PropDescriptor {
    fn new(name: impl Into<String>, kind: PropKind) -> Self {
        Self {
            name: name.into(),
            kind,
            flags: PropFlags::NONE,
            bits: 0,
            low: 0.0,
            high: 0.0,
            num_elements: 0,
            table_name: None,
        }
    }
}

/// Encoding parameters of a scalar property, without a name or accessor.
///
/// Used directly as the element template of arrays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropTemplate {
    kind: PropKind,
    flags: PropFlags,
    bits: u8,
    low: f32,
    high: f32,
}

impl PropTemplate {
    /// Fixed-width (or `VARINT`) 32-bit integer.
    #[must_use]
    pub const fn int(bits: u8, flags: PropFlags) -> Self {
        Self::plain(PropKind::Int, bits, flags)
    }

    /// Fixed-width (or `VARINT`) 64-bit integer.
    #[must_use]
    pub const fn int64(bits: u8, flags: PropFlags) -> Self {
        Self::plain(PropKind::Int64, bits, flags)
    }

    /// Length-prefixed string.
    #[must_use]
    pub const fn string() -> Self {
        Self::plain(PropKind::String, 0, PropFlags::NONE)
    }

    /// Float quantized over `[low, high]` unless a special encoding flag is set.
    #[must_use]
    pub fn float(bits: u8, low: f32, high: f32, flags: PropFlags) -> Self {
        Self::ranged(PropKind::Float, bits, low, high, flags)
    }

    /// Three floats sharing one encoding.
    #[must_use]
    pub fn vector(bits: u8, low: f32, high: f32, flags: PropFlags) -> Self {
        Self::ranged(PropKind::Vector, bits, low, high, flags)
    }

    /// Two floats sharing one encoding.
    #[must_use]
    pub fn vector_xy(bits: u8, low: f32, high: f32, flags: PropFlags) -> Self {
        Self::ranged(PropKind::VectorXY, bits, low, high, flags)
    }

    /// Returns the property kind.
    #[must_use]
    pub const fn kind(&self) -> PropKind {
        self.kind
    }

    const fn plain(kind: PropKind, bits: u8, flags: PropFlags) -> Self {
        Self {
            kind,
            flags,
            bits,
            low: 0.0,
            high: 0.0,
        }
    }

    fn ranged(kind: PropKind, bits: u8, low: f32, high: f32, flags: PropFlags) -> Self {
        let mut template = Self {
            kind,
            flags,
            bits,
            low,
            high,
        };
        if flags.is_special_float() {
            return template;
        }
        if bits == 0 || bits >= 32 {
            template.flags |= PropFlags::NOSCALE;
            template.bits = 32;
            return template;
        }
        let step = (high - low) / (1u32 << bits) as f32;
        if flags.contains(PropFlags::ROUNDDOWN) {
            template.high = high - step;
        } else if flags.contains(PropFlags::ROUNDUP) {
            template.low = low + step;
        }
        template
    }

    fn descriptor(self, name: String) -> PropDescriptor {
        PropDescriptor {
            flags: self.flags,
            bits: self.bits,
            low: self.low,
            high: self.high,
            ..PropDescriptor::new(name, self.kind)
        }
    }
}

/// One property of a [`SendTable`].
pub struct SendProp<T> {
    desc: PropDescriptor,
    high_low_mul: f32,
    element: Option<Arc<SendProp<T>>>,
    table: Option<Arc<SendTable<T>>>,
    value: Option<ValueFn<T>>,
    length: Option<LengthFn<T>>,
    table_proxy: Option<TableProxyFn<T>>,
    clamp_warned: AtomicBool,
}

impl<T> SendProp<T> {
    /// Creates a structural property with no accessors.
    ///
    /// `table` must be set for `DataTable` properties. Array properties are
    /// linked to their element template when the owning table is assembled.
    #[must_use]
    pub fn from_descriptor(desc: PropDescriptor, table: Option<Arc<SendTable<T>>>) -> Self {
        Self {
            high_low_mul: range_multiplier(desc.bits, desc.low, desc.high),
            desc,
            element: None,
            table,
            value: None,
            length: None,
            table_proxy: None,
            clamp_warned: AtomicBool::new(false),
        }
    }

    /// A nested table that is always visible.
    #[must_use]
    pub fn data_table(name: impl Into<String>, table: Arc<SendTable<T>>) -> Self {
        let mut desc = PropDescriptor::new(name, PropKind::DataTable);
        desc.flags = PropFlags::PROXY_ALWAYS_YES;
        desc.table_name = Some(table.name().to_owned());
        Self::from_descriptor(desc, Some(table))
    }

    /// Suppresses `table.prop` wherever it is reached while flattening.
    #[must_use]
    pub fn exclude(table: impl Into<String>, prop: impl Into<String>) -> Self {
        let mut desc = PropDescriptor::new(prop, PropKind::Int);
        desc.flags = PropFlags::EXCLUDE;
        desc.table_name = Some(table.into());
        Self::from_descriptor(desc, None)
    }

    /// Inlines a nested table's properties into the parent node when flattening.
    #[must_use]
    pub fn collapsible(mut self) -> Self {
        self.desc.flags |= PropFlags::COLLAPSIBLE | PropFlags::PROXY_ALWAYS_YES;
        self
    }

    /// Adds flags to the property.
    #[must_use]
    pub fn with_flags(mut self, flags: PropFlags) -> Self {
        self.desc.flags |= flags;
        self
    }

    pub fn descriptor(&self) -> &PropDescriptor {
        &self.desc
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub const fn kind(&self) -> PropKind {
        self.desc.kind
    }

    pub const fn flags(&self) -> PropFlags {
        self.desc.flags
    }

    pub const fn bits(&self) -> u8 {
        self.desc.bits
    }

    pub const fn low(&self) -> f32 {
        self.desc.low
    }

    pub const fn high(&self) -> f32 {
        self.desc.high
    }

    /// Scale from `[low, high]` to the quantized integer range.
    pub const fn high_low_mul(&self) -> f32 {
        self.high_low_mul
    }

    pub const fn num_elements(&self) -> usize {
        self.desc.num_elements as usize
    }

    /// Number of bits used for an array's element count.
    pub fn array_length_bits(&self) -> u8 {
        let elements = self.desc.num_elements.max(1);
        (u16::BITS - elements.leading_zeros()) as u8
    }

    pub fn table_name(&self) -> Option<&str> {
        self.desc.table_name.as_deref()
    }

    /// Element template of an array property.
    pub fn element(&self) -> Option<&SendProp<T>> {
        self.element.as_deref()
    }

    /// Nested table of a `DataTable` property.
    pub fn table(&self) -> Option<&Arc<SendTable<T>>> {
        self.table.as_ref()
    }

    /// Visibility proxy of a nested table, if any.
    pub fn table_proxy(&self) -> Option<&TableProxyFn<T>> {
        self.table_proxy.as_ref()
    }

    /// Reads the value (or element `element`) from `object`.
    pub fn value(&self, object: &T, element: usize) -> Option<PropValue> {
        self.value.as_ref().map(|get| get(object, element))
    }

    /// Reads the live length of an array; `None` when no length accessor is bound.
    pub fn array_length(&self, object: &T, object_id: ObjectId) -> Option<usize> {
        self.length.as_ref().map(|len| len(object, object_id))
    }

    /// Returns true the first time it is called, false afterwards.
    pub fn take_clamp_warning(&self) -> bool {
        !self.clamp_warned.swap(true, Ordering::Relaxed)
    }

    fn with_element(mut self, element: Option<Arc<Self>>) -> Self {
        self.element = element;
        self
    }
}

impl<T: 'static> SendProp<T> {
    /// A scalar property read through `get(object, element)`.
    #[must_use]
    pub fn scalar(
        name: impl Into<String>,
        template: PropTemplate,
        get: impl Fn(&T, usize) -> PropValue + Send + Sync + 'static,
    ) -> Self {
        let mut prop = Self::from_descriptor(template.descriptor(name.into()), None);
        prop.value = Some(Arc::new(get));
        prop
    }

    #[must_use]
    pub fn int(
        name: impl Into<String>,
        bits: u8,
        flags: PropFlags,
        get: impl Fn(&T) -> i32 + Send + Sync + 'static,
    ) -> Self {
        Self::scalar(name, PropTemplate::int(bits, flags), move |obj, _| {
            PropValue::Int(get(obj))
        })
    }

    #[must_use]
    pub fn int64(
        name: impl Into<String>,
        bits: u8,
        flags: PropFlags,
        get: impl Fn(&T) -> i64 + Send + Sync + 'static,
    ) -> Self {
        Self::scalar(name, PropTemplate::int64(bits, flags), move |obj, _| {
            PropValue::Int64(get(obj))
        })
    }

    #[must_use]
    pub fn float(
        name: impl Into<String>,
        bits: u8,
        low: f32,
        high: f32,
        flags: PropFlags,
        get: impl Fn(&T) -> f32 + Send + Sync + 'static,
    ) -> Self {
        Self::scalar(
            name,
            PropTemplate::float(bits, low, high, flags),
            move |obj, _| PropValue::Float(get(obj)),
        )
    }

    #[must_use]
    pub fn vector(
        name: impl Into<String>,
        bits: u8,
        low: f32,
        high: f32,
        flags: PropFlags,
        get: impl Fn(&T) -> [f32; 3] + Send + Sync + 'static,
    ) -> Self {
        Self::scalar(
            name,
            PropTemplate::vector(bits, low, high, flags),
            move |obj, _| PropValue::Vector(get(obj)),
        )
    }

    #[must_use]
    pub fn vector_xy(
        name: impl Into<String>,
        bits: u8,
        low: f32,
        high: f32,
        flags: PropFlags,
        get: impl Fn(&T) -> [f32; 2] + Send + Sync + 'static,
    ) -> Self {
        Self::scalar(
            name,
            PropTemplate::vector_xy(bits, low, high, flags),
            move |obj, _| PropValue::VectorXY(get(obj)),
        )
    }

    #[must_use]
    pub fn string(
        name: impl Into<String>,
        get: impl Fn(&T) -> String + Send + Sync + 'static,
    ) -> Self {
        Self::scalar(name, PropTemplate::string(), move |obj, _| {
            PropValue::String(get(obj))
        })
    }

    /// The array half of an element/array pair; the element must precede it.
    #[must_use]
    pub fn array(name: impl Into<String>, num_elements: usize) -> Self {
        let mut desc = PropDescriptor::new(name, PropKind::Array);
        desc.num_elements = u16::try_from(num_elements).unwrap_or(u16::MAX);
        Self::from_descriptor(desc, None)
    }

    /// Binds the live-length accessor of an array.
    #[must_use]
    pub fn with_length(mut self, length: impl Fn(&T, ObjectId) -> usize + Send + Sync + 'static) -> Self {
        self.length = Some(Arc::new(length));
        self
    }

    /// Gates a nested table behind a per-object visibility proxy.
    #[must_use]
    pub fn with_proxy(
        mut self,
        proxy: impl Fn(&T, ObjectId, &mut Recipients) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.desc.flags = self.desc.flags.without(PropFlags::PROXY_ALWAYS_YES);
        self.table_proxy = Some(Arc::new(proxy));
        self
    }
}

impl<T> fmt::Debug for SendProp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendProp")
            .field("desc", &self.desc)
            .field("has_value", &self.value.is_some())
            .field("has_length", &self.length.is_some())
            .field("has_proxy", &self.table_proxy.is_some())
            .finish_non_exhaustive()
    }
}

/// An immutable, named list of send properties.
pub struct SendTable<T> {
    name: String,
    props: Vec<Arc<SendProp<T>>>,
}

impl<T> SendTable<T> {
    /// Starts building a table.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SendTableBuilder<T> {
        SendTableBuilder {
            name: name.into(),
            props: Vec::new(),
        }
    }

    /// Validates `props` and assembles them into a table.
    pub fn from_props(name: impl Into<String>, props: Vec<SendProp<T>>) -> SchemaResult<Arc<Self>> {
        let name = name.into();
        validate_name(&name)?;
        validate_props(&name, &props)?;
        Ok(Arc::new(Self::link(name, props)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn props(&self) -> &[Arc<SendProp<T>>] {
        &self.props
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// Finds a property by case-insensitive name, skipping element templates and excludes.
    pub fn find_prop(&self, name: &str) -> Option<&Arc<SendProp<T>>> {
        self.props.iter().find(|prop| {
            !prop.flags().intersects(PropFlags::INSIDE_ARRAY | PropFlags::EXCLUDE)
                && prop.name().eq_ignore_ascii_case(name)
        })
    }

    /// Returns the structural copy of this table tree, without accessors.
    ///
    /// Nested tables shared by name stay shared in the copy.
    #[must_use]
    pub fn describe(&self) -> Arc<SendTable<Unbound>> {
        let mut memo = HashMap::new();
        self.describe_with(&mut memo)
    }

    fn describe_with(&self, memo: &mut HashMap<String, Arc<SendTable<Unbound>>>) -> Arc<SendTable<Unbound>> {
        if let Some(done) = memo.get(&self.name) {
            return Arc::clone(done);
        }
        let props: Vec<SendProp<Unbound>> = self
            .props
            .iter()
            .map(|prop| {
                let table = prop.table.as_ref().map(|child| child.describe_with(memo));
                SendProp::from_descriptor(prop.desc.clone(), table)
            })
            .collect();
        let described = Arc::new(SendTable::link(self.name.clone(), props));
        memo.insert(self.name.clone(), Arc::clone(&described));
        described
    }

    fn link(name: String, props: Vec<SendProp<T>>) -> Self {
        let mut linked: Vec<Arc<SendProp<T>>> = Vec::with_capacity(props.len());
        for prop in props {
            let element = if prop.kind() == PropKind::Array {
                linked
                    .last()
                    .filter(|prev| prev.flags().contains(PropFlags::INSIDE_ARRAY))
                    .cloned()
            } else {
                None
            };
            linked.push(Arc::new(prop.with_element(element)));
        }
        Self {
            name,
            props: linked,
        }
    }
}

impl<T> fmt::Debug for SendTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendTable")
            .field("name", &self.name)
            .field("props", &self.props)
            .finish()
    }
}

/// Builder for [`SendTable`].
pub struct SendTableBuilder<T> {
    name: String,
    props: Vec<SendProp<T>>,
}

impl<T: 'static> SendTableBuilder<T> {
    /// Appends an already-constructed property.
    #[must_use]
    pub fn prop(mut self, prop: SendProp<T>) -> Self {
        self.props.push(prop);
        self
    }

    #[must_use]
    pub fn int(
        self,
        name: impl Into<String>,
        bits: u8,
        flags: PropFlags,
        get: impl Fn(&T) -> i32 + Send + Sync + 'static,
    ) -> Self {
        self.prop(SendProp::int(name, bits, flags, get))
    }

    #[must_use]
    pub fn int64(
        self,
        name: impl Into<String>,
        bits: u8,
        flags: PropFlags,
        get: impl Fn(&T) -> i64 + Send + Sync + 'static,
    ) -> Self {
        self.prop(SendProp::int64(name, bits, flags, get))
    }

    #[must_use]
    pub fn float(
        self,
        name: impl Into<String>,
        bits: u8,
        low: f32,
        high: f32,
        flags: PropFlags,
        get: impl Fn(&T) -> f32 + Send + Sync + 'static,
    ) -> Self {
        self.prop(SendProp::float(name, bits, low, high, flags, get))
    }

    #[must_use]
    pub fn vector(
        self,
        name: impl Into<String>,
        bits: u8,
        low: f32,
        high: f32,
        flags: PropFlags,
        get: impl Fn(&T) -> [f32; 3] + Send + Sync + 'static,
    ) -> Self {
        self.prop(SendProp::vector(name, bits, low, high, flags, get))
    }

    #[must_use]
    pub fn vector_xy(
        self,
        name: impl Into<String>,
        bits: u8,
        low: f32,
        high: f32,
        flags: PropFlags,
        get: impl Fn(&T) -> [f32; 2] + Send + Sync + 'static,
    ) -> Self {
        self.prop(SendProp::vector_xy(name, bits, low, high, flags, get))
    }

    #[must_use]
    pub fn string(
        self,
        name: impl Into<String>,
        get: impl Fn(&T) -> String + Send + Sync + 'static,
    ) -> Self {
        self.prop(SendProp::string(name, get))
    }

    /// Appends an element template followed by a fixed-length array.
    #[must_use]
    pub fn array(
        self,
        name: impl Into<String>,
        num_elements: usize,
        element: PropTemplate,
        get: impl Fn(&T, usize) -> PropValue + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        self.prop(
            SendProp::scalar(format!("{name}_element"), element, get)
                .with_flags(PropFlags::INSIDE_ARRAY),
        )
        .prop(SendProp::array(name, num_elements))
    }

    /// Appends an element template followed by an array whose live length is `length`.
    #[must_use]
    pub fn array_with_length(
        self,
        name: impl Into<String>,
        num_elements: usize,
        element: PropTemplate,
        get: impl Fn(&T, usize) -> PropValue + Send + Sync + 'static,
        length: impl Fn(&T, ObjectId) -> usize + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        self.prop(
            SendProp::scalar(format!("{name}_element"), element, get)
                .with_flags(PropFlags::INSIDE_ARRAY),
        )
        .prop(SendProp::array(name, num_elements).with_length(length))
    }

    /// Appends an always-visible nested table.
    #[must_use]
    pub fn table(self, name: impl Into<String>, table: Arc<SendTable<T>>) -> Self {
        self.prop(SendProp::data_table(name, table))
    }

    /// Appends a nested table gated by a visibility proxy.
    #[must_use]
    pub fn gated_table(
        self,
        name: impl Into<String>,
        table: Arc<SendTable<T>>,
        proxy: impl Fn(&T, ObjectId, &mut Recipients) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.prop(SendProp::data_table(name, table).with_proxy(proxy))
    }

    /// Appends a nested table whose properties are inlined into this table's node.
    #[must_use]
    pub fn collapsible_table(self, name: impl Into<String>, table: Arc<SendTable<T>>) -> Self {
        self.prop(SendProp::data_table(name, table).collapsible())
    }

    /// Suppresses `table.prop` in this table tree.
    #[must_use]
    pub fn exclude(self, table: impl Into<String>, prop: impl Into<String>) -> Self {
        self.prop(SendProp::exclude(table, prop))
    }

    /// Validates and assembles the table.
    pub fn build(self) -> SchemaResult<Arc<SendTable<T>>> {
        SendTable::from_props(self.name, self.props)
    }
}

/// Computes the quantization multiplier for a `bits`-wide range.
///
/// The multiplier is shrunk until `mul * (high - low)` cannot exceed the
/// largest encodable value.
#[must_use]
pub fn range_multiplier(bits: u8, low: f32, high: f32) -> f32 {
    if bits == 0 || bits > 32 {
        return 0.0;
    }
    let high_value = if bits == 32 {
        f64::from(u32::MAX - 1)
    } else {
        f64::from((1u32 << bits) - 1)
    };
    let range = f64::from(high) - f64::from(low);
    if range <= 0.0 || !range.is_finite() {
        return high_value as f32;
    }
    let mut mul = (high_value / range) as f32;
    if f64::from(mul) * range > high_value {
        for factor in [0.9999, 0.99, 0.9, 0.8, 0.7] {
            mul = (high_value / range * factor) as f32;
            if f64::from(mul) * range <= high_value {
                break;
            }
        }
    }
    mul
}

pub(crate) fn validate_name(name: &str) -> SchemaResult<()> {
    if name.is_empty() || name.contains('\0') {
        return Err(SchemaError::InvalidName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

fn validate_props<T>(table: &str, props: &[SendProp<T>]) -> SchemaResult<()> {
    let mut seen: Vec<String> = Vec::with_capacity(props.len());
    for (index, prop) in props.iter().enumerate() {
        validate_name(prop.name())?;
        let flags = prop.flags();

        if flags.contains(PropFlags::EXCLUDE) {
            match prop.table_name() {
                Some(excluded) => validate_name(excluded)?,
                None => {
                    return Err(SchemaError::MissingTable {
                        prop: prop.name().to_owned(),
                    })
                }
            }
            continue;
        }

        if flags.contains(PropFlags::INSIDE_ARRAY) {
            let followed_by_array = props
                .get(index + 1)
                .is_some_and(|next| next.kind() == PropKind::Array);
            if !followed_by_array {
                return Err(SchemaError::DanglingElement {
                    table: table.to_owned(),
                    prop: prop.name().to_owned(),
                });
            }
        } else {
            let lowered = prop.name().to_ascii_lowercase();
            if seen.contains(&lowered) {
                return Err(SchemaError::DuplicateProp {
                    table: table.to_owned(),
                    prop: prop.name().to_owned(),
                });
            }
            seen.push(lowered);
        }

        match prop.kind() {
            PropKind::Array => {
                let element = index
                    .checked_sub(1)
                    .and_then(|prev| props.get(prev))
                    .filter(|prev| prev.flags().contains(PropFlags::INSIDE_ARRAY))
                    .ok_or_else(|| SchemaError::ArrayWithoutElement {
                        table: table.to_owned(),
                        prop: prop.name().to_owned(),
                    })?;
                if !element.kind().is_scalar() {
                    return Err(SchemaError::InvalidElementKind {
                        table: table.to_owned(),
                        prop: element.name().to_owned(),
                        kind: element.kind(),
                    });
                }
                let count = prop.num_elements();
                if count == 0 || count > MAX_ARRAY_ELEMENTS {
                    return Err(SchemaError::InvalidElementCount {
                        prop: prop.name().to_owned(),
                        count,
                        max: MAX_ARRAY_ELEMENTS,
                    });
                }
            }
            PropKind::DataTable => {
                if prop.table.is_none() {
                    return Err(SchemaError::MissingTable {
                        prop: prop.name().to_owned(),
                    });
                }
                if flags.contains(PropFlags::COLLAPSIBLE) && prop.table_proxy.is_some() {
                    return Err(SchemaError::CollapsibleWithProxy {
                        prop: prop.name().to_owned(),
                    });
                }
            }
            kind => validate_scalar(prop.name(), kind, flags, prop.bits(), prop.low(), prop.high())?,
        }
    }
    Ok(())
}

fn validate_scalar(
    name: &str,
    kind: PropKind,
    flags: PropFlags,
    bits: u8,
    low: f32,
    high: f32,
) -> SchemaResult<()> {
    let bad_bits = || SchemaError::InvalidBitWidth {
        prop: name.to_owned(),
        kind,
        bits,
    };
    match kind {
        PropKind::Int if !flags.contains(PropFlags::VARINT) => {
            if !(1..=32).contains(&bits) {
                return Err(bad_bits());
            }
        }
        PropKind::Int64 if !flags.contains(PropFlags::VARINT) => {
            if !(33..=64).contains(&bits) {
                return Err(bad_bits());
            }
        }
        PropKind::Float | PropKind::Vector | PropKind::VectorXY if !flags.is_special_float() => {
            if !(1..=31).contains(&bits) {
                return Err(bad_bits());
            }
            if !(low.is_finite() && high.is_finite() && low < high) {
                return Err(SchemaError::InvalidRange {
                    prop: name.to_owned(),
                    low,
                    high,
                });
            }
        }
        _ => {}
    }
    Ok(())
}
