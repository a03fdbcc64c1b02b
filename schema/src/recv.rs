//! Receive-side property tables.
//!
//! A [`RecvTable`] names the fields a receiver understands and how to store a
//! decoded value into a destination object of type `R`.

use std::fmt;
use std::sync::Arc;

use crate::error::{SchemaError, SchemaResult};
use crate::send::{validate_name, MAX_ARRAY_ELEMENTS};
use crate::{ObjectId, PropFlags, PropKind, PropValue};

/// Default receive buffer for string properties, terminator included.
pub const DEFAULT_STRING_BUFFER: usize = 512;

/// A decoded value on its way into the destination object.
#[derive(Debug, Clone, PartialEq)]
pub struct RecvProxyData {
    pub value: PropValue,
    /// Element index for array elements, 0 otherwise.
    pub element: usize,
    pub object_id: ObjectId,
}

/// Stores a decoded value into the destination object.
pub type ApplyFn<R> = Arc<dyn Fn(&mut R, &RecvProxyData) + Send + Sync>;
/// Resizes a destination array before its elements are applied.
pub type RecvLengthFn<R> = Arc<dyn Fn(&mut R, ObjectId, usize) + Send + Sync>;

/// One property of a [`RecvTable`].
pub struct RecvProp<R> {
    name: String,
    kind: PropKind,
    flags: PropFlags,
    num_elements: usize,
    string_buffer: usize,
    element: Option<Arc<RecvProp<R>>>,
    table: Option<Arc<RecvTable<R>>>,
    apply: Option<ApplyFn<R>>,
    length: Option<RecvLengthFn<R>>,
}

impl<R> RecvProp<R> {
    fn new(name: impl Into<String>, kind: PropKind) -> Self {
        Self {
            name: name.into(),
            kind,
            flags: PropFlags::NONE,
            num_elements: 0,
            string_buffer: DEFAULT_STRING_BUFFER,
            element: None,
            table: None,
            apply: None,
            length: None,
        }
    }

    /// A nested receive table.
    #[must_use]
    pub fn data_table(name: impl Into<String>, table: Arc<RecvTable<R>>) -> Self {
        let mut prop = Self::new(name, PropKind::DataTable);
        prop.table = Some(table);
        prop
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn kind(&self) -> PropKind {
        self.kind
    }

    pub const fn flags(&self) -> PropFlags {
        self.flags
    }

    pub const fn num_elements(&self) -> usize {
        self.num_elements
    }

    /// Receive buffer size for strings; longer values are truncated to `size - 1` bytes.
    pub const fn string_buffer(&self) -> usize {
        self.string_buffer
    }

    pub fn element(&self) -> Option<&RecvProp<R>> {
        self.element.as_deref()
    }

    pub fn table(&self) -> Option<&Arc<RecvTable<R>>> {
        self.table.as_ref()
    }

    /// Stores `data` into `dst`. Properties without an apply callback ignore it.
    pub fn apply(&self, dst: &mut R, data: &RecvProxyData) {
        if let Some(apply) = &self.apply {
            apply(dst, data);
        }
    }

    /// Announces the incoming element count of an array.
    pub fn resize(&self, dst: &mut R, object_id: ObjectId, len: usize) {
        if let Some(length) = &self.length {
            length(dst, object_id, len);
        }
    }
}

impl<R: 'static> RecvProp<R> {
    /// A scalar property stored through `apply`.
    #[must_use]
    pub fn scalar(
        name: impl Into<String>,
        kind: PropKind,
        apply: impl Fn(&mut R, &RecvProxyData) + Send + Sync + 'static,
    ) -> Self {
        let mut prop = Self::new(name, kind);
        prop.apply = Some(Arc::new(apply));
        prop
    }

    /// Sets the string receive buffer size.
    #[must_use]
    pub const fn with_string_buffer(mut self, size: usize) -> Self {
        self.string_buffer = size;
        self
    }
}

impl<R> fmt::Debug for RecvProp<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecvProp")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("flags", &self.flags)
            .field("num_elements", &self.num_elements)
            .field("table", &self.table.as_ref().map(|t| t.name()))
            .finish_non_exhaustive()
    }
}

/// An immutable, named list of receive properties.
pub struct RecvTable<R> {
    name: String,
    props: Vec<Arc<RecvProp<R>>>,
}

impl<R> RecvTable<R> {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> RecvTableBuilder<R> {
        RecvTableBuilder {
            name: name.into(),
            props: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn props(&self) -> &[Arc<RecvProp<R>>] {
        &self.props
    }

    /// Finds a property by case-insensitive name, skipping element templates.
    pub fn find_prop(&self, name: &str) -> Option<&Arc<RecvProp<R>>> {
        self.props.iter().find(|prop| {
            !prop.flags.contains(PropFlags::INSIDE_ARRAY) && prop.name.eq_ignore_ascii_case(name)
        })
    }
}

impl<R> fmt::Debug for RecvTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecvTable")
            .field("name", &self.name)
            .field("props", &self.props)
            .finish()
    }
}

/// Builder for [`RecvTable`].
pub struct RecvTableBuilder<R> {
    name: String,
    props: Vec<RecvProp<R>>,
}

impl<R: 'static> RecvTableBuilder<R> {
    #[must_use]
    pub fn prop(mut self, prop: RecvProp<R>) -> Self {
        self.props.push(prop);
        self
    }

    #[must_use]
    pub fn int(self, name: impl Into<String>, set: impl Fn(&mut R, i32) + Send + Sync + 'static) -> Self {
        self.prop(RecvProp::scalar(name, PropKind::Int, move |dst, data| {
            if let PropValue::Int(v) = data.value {
                set(dst, v);
            }
        }))
    }

    #[must_use]
    pub fn int64(self, name: impl Into<String>, set: impl Fn(&mut R, i64) + Send + Sync + 'static) -> Self {
        self.prop(RecvProp::scalar(name, PropKind::Int64, move |dst, data| {
            if let PropValue::Int64(v) = data.value {
                set(dst, v);
            }
        }))
    }

    #[must_use]
    pub fn float(self, name: impl Into<String>, set: impl Fn(&mut R, f32) + Send + Sync + 'static) -> Self {
        self.prop(RecvProp::scalar(name, PropKind::Float, move |dst, data| {
            if let PropValue::Float(v) = data.value {
                set(dst, v);
            }
        }))
    }

    #[must_use]
    pub fn vector(
        self,
        name: impl Into<String>,
        set: impl Fn(&mut R, [f32; 3]) + Send + Sync + 'static,
    ) -> Self {
        self.prop(RecvProp::scalar(name, PropKind::Vector, move |dst, data| {
            if let PropValue::Vector(v) = data.value {
                set(dst, v);
            }
        }))
    }

    #[must_use]
    pub fn vector_xy(
        self,
        name: impl Into<String>,
        set: impl Fn(&mut R, [f32; 2]) + Send + Sync + 'static,
    ) -> Self {
        self.prop(RecvProp::scalar(name, PropKind::VectorXY, move |dst, data| {
            if let PropValue::VectorXY(v) = data.value {
                set(dst, v);
            }
        }))
    }

    /// A string stored into a buffer of `buffer_size` bytes (terminator included).
    #[must_use]
    pub fn string(
        self,
        name: impl Into<String>,
        buffer_size: usize,
        set: impl Fn(&mut R, String) + Send + Sync + 'static,
    ) -> Self {
        self.prop(
            RecvProp::scalar(name, PropKind::String, move |dst, data| {
                if let PropValue::String(v) = &data.value {
                    set(dst, v.clone());
                }
            })
            .with_string_buffer(buffer_size),
        )
    }

    /// An element template of kind `element` followed by the array itself.
    ///
    /// `set` receives the element index and value; `resize` runs before any
    /// element of a decoded array is applied.
    #[must_use]
    pub fn array(
        self,
        name: impl Into<String>,
        element: PropKind,
        num_elements: usize,
        set: impl Fn(&mut R, usize, PropValue) + Send + Sync + 'static,
        resize: impl Fn(&mut R, ObjectId, usize) + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        let mut template = RecvProp::scalar(format!("{name}_element"), element, move |dst, data| {
            set(dst, data.element, data.value.clone());
        });
        template.flags = PropFlags::INSIDE_ARRAY;
        let mut array = RecvProp::new(name, PropKind::Array);
        array.num_elements = num_elements;
        array.length = Some(Arc::new(resize));
        self.prop(template).prop(array)
    }

    #[must_use]
    pub fn table(self, name: impl Into<String>, table: Arc<RecvTable<R>>) -> Self {
        self.prop(RecvProp::data_table(name, table))
    }

    /// Validates and assembles the table.
    pub fn build(self) -> SchemaResult<Arc<RecvTable<R>>> {
        validate_name(&self.name)?;
        let mut props: Vec<Arc<RecvProp<R>>> = Vec::with_capacity(self.props.len());
        let mut seen: Vec<String> = Vec::new();
        let mut pending = self.props.into_iter().peekable();
        while let Some(mut prop) = pending.next() {
            validate_name(&prop.name)?;
            if prop.flags.contains(PropFlags::INSIDE_ARRAY) {
                if !pending.peek().is_some_and(|next| next.kind == PropKind::Array) {
                    return Err(SchemaError::DanglingElement {
                        table: self.name,
                        prop: prop.name,
                    });
                }
            } else {
                let lowered = prop.name.to_ascii_lowercase();
                if seen.contains(&lowered) {
                    return Err(SchemaError::DuplicateProp {
                        table: self.name,
                        prop: prop.name,
                    });
                }
                seen.push(lowered);
            }
            match prop.kind {
                PropKind::Array => {
                    let element = props
                        .last()
                        .filter(|prev| prev.flags.contains(PropFlags::INSIDE_ARRAY))
                        .cloned();
                    let Some(element) = element else {
                        return Err(SchemaError::ArrayWithoutElement {
                            table: self.name,
                            prop: prop.name,
                        });
                    };
                    if prop.num_elements == 0 || prop.num_elements > MAX_ARRAY_ELEMENTS {
                        return Err(SchemaError::InvalidElementCount {
                            prop: prop.name,
                            count: prop.num_elements,
                            max: MAX_ARRAY_ELEMENTS,
                        });
                    }
                    prop.element = Some(element);
                }
                PropKind::DataTable if prop.table.is_none() => {
                    return Err(SchemaError::MissingTable { prop: prop.name });
                }
                _ => {}
            }
            props.push(Arc::new(prop));
        }
        Ok(Arc::new(RecvTable {
            name: self.name,
            props,
        }))
    }
}
