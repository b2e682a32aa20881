//! Objects behind the pointers the fixture hands out.
//!
//! Every pointer given to the caller is an `Arc<Node>` turned into a raw
//! pointer; releasing it drops that reference. The default options are the
//! one exception: they live in a static and are only ever borrowed.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use hostlink_host::abi::{AbiStr, ObjectPtr};
use hostlink_types::ValueKind;
use uuid::Uuid;

use crate::catalog::{self, TypeDef};

pub static LIVE_COUNTED: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Text(String),
    Bool(bool),
    Uuid(Uuid),
    Version([i32; 4]),
    Object(Arc<Node>),
    Json(serde_json::Value),
}

impl Value {
    pub fn default_for(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => Self::Bool(false),
            ValueKind::Uuid => Self::Uuid(Uuid::nil()),
            _ => Self::Null,
        }
    }

    pub fn fits(&self, kind: ValueKind) -> bool {
        match (self, kind) {
            (Self::Null, ValueKind::Text | ValueKind::Version | ValueKind::Object | ValueKind::Unsupported) => true,
            (Self::Text(_), ValueKind::Text)
            | (Self::Bool(_), ValueKind::Bool)
            | (Self::Uuid(_), ValueKind::Uuid)
            | (Self::Version(_), ValueKind::Version)
            | (Self::Object(_), ValueKind::Object)
            | (Self::Json(_), ValueKind::Unsupported) => true,
            _ => false,
        }
    }
}

#[derive(Debug)]
pub struct Instance {
    pub ty: &'static TypeDef,
    values: Mutex<BTreeMap<&'static str, Value>>,
}

impl Instance {
    pub fn get(&self, field: &str) -> Value {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(field)
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn set(&self, field: &'static str, value: Value) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(field, value);
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        if self.ty.full_name == catalog::COUNTED {
            LIVE_COUNTED.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub tagged: bool,
    pub indented: bool,
}

#[derive(Debug)]
pub enum Node {
    Instance(Instance),
    Settings(Settings),
}

impl Node {
    pub fn instance(&self) -> Option<&Instance> {
        match self {
            Self::Instance(instance) => Some(instance),
            Self::Settings(_) => None,
        }
    }

    pub fn settings(&self) -> Option<Settings> {
        match self {
            Self::Settings(settings) => Some(*settings),
            Self::Instance(_) => None,
        }
    }
}

/// A fresh instance of `ty` with every field at its default.
pub fn construct(ty: &'static TypeDef) -> Arc<Node> {
    if ty.full_name == catalog::COUNTED {
        LIVE_COUNTED.fetch_add(1, Ordering::SeqCst);
    }
    let values = ty
        .fields
        .iter()
        .map(|f| (f.name, Value::default_for(f.kind)))
        .collect();
    Arc::new(Node::Instance(Instance {
        ty,
        values: Mutex::new(values),
    }))
}

/// Hands a new reference to the caller.
pub fn into_ptr(node: Arc<Node>) -> ObjectPtr {
    Arc::into_raw(node).cast_mut().cast::<c_void>()
}

/// Borrows the node behind a caller-held pointer.
///
/// # Safety
/// `ptr` must be null or a pointer this library handed out that has not
/// been released.
pub unsafe fn borrow<'a>(ptr: ObjectPtr) -> Option<&'a Node> {
    unsafe { ptr.cast::<Node>().cast_const().as_ref() }
}

/// Takes an extra reference to a heap node the caller holds.
///
/// # Safety
/// As for [`borrow`], and `ptr` must not be the static default options.
pub unsafe fn share(ptr: ObjectPtr) -> Arc<Node> {
    let ptr = ptr.cast::<Node>().cast_const();
    unsafe {
        Arc::increment_strong_count(ptr);
        Arc::from_raw(ptr)
    }
}

/// Drops one caller reference.
///
/// # Safety
/// As for [`share`]; the caller gives up its reference.
pub unsafe fn release(ptr: ObjectPtr) {
    if !ptr.is_null() {
        drop(unsafe { Arc::from_raw(ptr.cast::<Node>().cast_const()) });
    }
}

thread_local! {
    static SCRATCH: RefCell<String> = const { RefCell::new(String::new()) };
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Stores `text` until the next call that hands out text and borrows it.
pub fn hand_out(text: String) -> AbiStr {
    SCRATCH.with(|scratch| {
        let mut scratch = scratch.borrow_mut();
        *scratch = text;
        AbiStr {
            ptr: scratch.as_ptr(),
            len: scratch.len(),
        }
    })
}

pub fn set_last_error(message: String) {
    LAST_ERROR.with(|last| *last.borrow_mut() = message);
}

pub fn last_error() -> AbiStr {
    LAST_ERROR.with(|last| {
        let last = last.borrow();
        AbiStr {
            ptr: last.as_ptr(),
            len: last.len(),
        }
    })
}

/// Copies borrowed caller text.
///
/// # Safety
/// `text` must satisfy [`AbiStr::copy_out`].
pub unsafe fn text(text: AbiStr) -> Result<String, String> {
    unsafe { text.copy_out() }.map_err(|e| e.to_string())
}
