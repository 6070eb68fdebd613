//! NULL-terminated string arrays for `exec`.
use failure::Fail;
use std::ffi::{CStr, CString, OsStr};
use std::os::unix::ffi::OsStrExt;

/// Error type for building argument or environment vectors.
#[derive(Debug, Fail, Clone, Copy, PartialEq, Eq)]
pub enum MarshalError {
    #[fail(display = "program path contains NULL")]
    Program,
    #[fail(display = "element #{} contains NULL", index)]
    Element { index: usize },
}

/// An owned `char *const []` with a trailing NULL, as consumed by `execv`
/// and friends.
///
/// The pointers refer to the heap buffers of `items`, which never move while
/// `self` is alive. Keep the array alive until `exec` returns.
#[derive(Debug)]
pub struct CStringArray {
    items: Vec<CString>,
    ptrs: Vec<*const libc::c_char>,
}

impl CStringArray {
    /// Converts `items` in order. Fails if any item contains NULL.
    pub fn new<I, S>(items: I) -> Result<Self, MarshalError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let items = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                CString::new(item.as_ref().as_bytes()).map_err(|_| MarshalError::Element { index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ptrs = items
            .iter()
            .map(|item| item.as_ptr())
            .chain(std::iter::once(std::ptr::null()))
            .collect();

        Ok(CStringArray { items, ptrs })
    }

    /// Number of strings, not counting the terminator.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All pointers, including the trailing NULL.
    pub fn pointers(&self) -> &[*const libc::c_char] {
        &self.ptrs
    }

    /// Pointer suitable for the `argv` or `envp` parameter of `exec`.
    pub fn as_ptr(&self) -> *const *const libc::c_char {
        self.ptrs.as_ptr()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CStr> {
        self.items.iter().map(|item| item.as_c_str())
    }
}
