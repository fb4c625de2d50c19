use std::ffi::{c_char, c_void, CStr};

use mc_decoder::ConvertedFrame;

use crate::api::McFrame;
use crate::Error;

/// Host callback receiving converted frames.
pub struct OnFrame {
    user_data: *mut c_void,
    on_frame: Option<unsafe extern "C" fn(user_data: *mut c_void, frame: *const McFrame)>,
}

impl OnFrame {
    /// # Safety
    ///
    /// `on_frame` must be null or valid to call with `user_data`.
    pub unsafe fn new(
        user_data: *mut c_void,
        on_frame: Option<unsafe extern "C" fn(user_data: *mut c_void, frame: *const McFrame)>,
    ) -> Self {
        Self { user_data, on_frame }
    }

    // The frame is only borrowed for the duration of the call.
    pub fn call(&mut self, frame: &ConvertedFrame) {
        if let Some(on_frame) = self.on_frame {
            let view = McFrame {
                data: frame.data.as_ptr(),
                len: frame.data.len(),
                width: frame.width,
                height: frame.height,
                stride: frame.stride,
            };
            unsafe { on_frame(self.user_data, &view) };
        }
    }

    /// Deliver `frames` in order, returning how many were delivered.
    pub fn deliver(&mut self, frames: &[ConvertedFrame]) -> usize {
        for frame in frames {
            self.call(frame);
        }
        frames.len()
    }
}

pub fn return_code<C: ReturnCode, F: FnOnce() -> C>(f: F) -> i32 {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(ret) => ret.code(),
        Err(_) => Error::Panic.code(),
    }
}

pub trait ReturnCode {
    fn code(&self) -> i32;
}

impl ReturnCode for () {
    fn code(&self) -> i32 {
        0
    }
}

impl ReturnCode for i32 {
    fn code(&self) -> i32 {
        *self
    }
}

impl ReturnCode for usize {
    fn code(&self) -> i32 {
        i32::try_from(*self).unwrap_or_else(|_| Error::InvalidCode.code())
    }
}

impl ReturnCode for Result<(), Error> {
    fn code(&self) -> i32 {
        match self {
            Ok(()) => 0,
            Err(e) => e.code(),
        }
    }
}

impl ReturnCode for Result<usize, Error> {
    fn code(&self) -> i32 {
        match self {
            Ok(count) => count.code(),
            Err(e) => e.code(),
        }
    }
}

/// # Safety
///
/// The caller must ensure that cstr is null or valid for 'a.
pub unsafe fn parse_str<'a>(cstr: *const c_char) -> Result<&'a str, Error> {
    if cstr.is_null() {
        return Ok("");
    }

    let string = unsafe { CStr::from_ptr(cstr) };
    Ok(string.to_str()?)
}

/// # Safety
///
/// The caller must ensure that data is valid for 'a.
pub unsafe fn parse_slice<'a>(data: *const u8, size: usize) -> Result<&'a [u8], Error> {
    if data.is_null() {
        if size == 0 {
            return Ok(&[]);
        }

        return Err(Error::InvalidPointer);
    }

    let data = unsafe { std::slice::from_raw_parts(data, size) };
    Ok(data)
}

/// # Safety
///
/// The caller must ensure that data is null or valid for writes of size bytes for 'a.
pub unsafe fn parse_slice_mut<'a>(data: *mut u8, size: usize) -> Result<&'a mut [u8], Error> {
    if data.is_null() {
        if size == 0 {
            return Ok(&mut []);
        }

        return Err(Error::InvalidPointer);
    }

    let data = unsafe { std::slice::from_raw_parts_mut(data, size) };
    Ok(data)
}

/// # Safety
///
/// The caller must ensure that handle is null or a live handle from this library.
pub unsafe fn parse_handle<'a, T>(handle: *mut T) -> Result<&'a mut T, Error> {
    unsafe { handle.as_mut() }.ok_or(Error::InvalidPointer)
}
