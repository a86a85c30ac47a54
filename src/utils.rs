/// Formats `value` like C's `printf("%.*g", precision, value)`: at most
/// `precision` significant digits, trailing zeros removed, switching to
/// exponent notation for very small or very large magnitudes.
pub fn format_g(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let precision = precision.max(1);
    let sci = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

/// Formats `value` like C's `printf("%f", value)`.
pub fn format_f(value: f64) -> String {
    format!("{value:.6}")
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(feature = "gdal")]
pub(crate) use self::ffi::*;

#[cfg(feature = "gdal")]
mod ffi {
    use std::ffi::{c_char, CStr, CString};
    use std::path::Path;

    use gdal_sys::{self, CPLErr};

    use crate::errors::*;

    pub fn _string(raw_ptr: *const c_char) -> String {
        if raw_ptr.is_null() {
            return String::new();
        }
        let c_str = unsafe { CStr::from_ptr(raw_ptr) };
        c_str.to_string_lossy().into_owned()
    }

    pub fn _string_array(raw_ptr: *mut *mut c_char) -> Vec<String> {
        let mut ret_val: Vec<String> = vec![];
        if raw_ptr.is_null() {
            return ret_val;
        }
        let mut i = 0;
        unsafe {
            loop {
                let next = raw_ptr.add(i).read();
                if next.is_null() {
                    break;
                }
                ret_val.push(_string(next));
                i += 1;
            }
        }
        ret_val
    }

    pub fn _last_cpl_err(cpl_err_class: CPLErr::Type) -> InfoError {
        let last_err_no = unsafe { gdal_sys::CPLGetLastErrorNo() };
        let last_err_msg = _string(unsafe { gdal_sys::CPLGetLastErrorMsg() });
        unsafe { gdal_sys::CPLErrorReset() };
        InfoError::CplError {
            class: cpl_err_class,
            number: last_err_no,
            msg: last_err_msg,
        }
    }

    /// Message of the last CPL error, clearing it.
    pub fn _last_cpl_err_msg() -> String {
        let last_err_msg = _string(unsafe { gdal_sys::CPLGetLastErrorMsg() });
        unsafe { gdal_sys::CPLErrorReset() };
        last_err_msg
    }

    pub fn _last_null_pointer_err(method_name: &'static str) -> InfoError {
        InfoError::NullPointer {
            method_name,
            msg: _last_cpl_err_msg(),
        }
    }

    pub fn _path_to_c_string(path: &Path) -> Result<CString> {
        let path_str = path.to_string_lossy();
        CString::new(path_str.as_ref()).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn g_formatting() {
        assert_eq!(format_g(1.0, 15), "1");
        assert_eq!(format_g(-2.5, 15), "-2.5");
        assert_eq!(format_g(26.1017, 15), "26.1017");
        assert_eq!(format_g(0.1 + 0.2, 15), "0.3");
        assert_eq!(format_g(1234567.0, 15), "1234567");
        assert_eq!(format_g(1e20, 15), "1e+20");
        assert_eq!(format_g(0.00001234, 15), "1.234e-05");
        assert_eq!(format_g(0.0, 15), "0");
        assert_eq!(format_g(123456.0, 3), "1.23e+05");
    }

    #[test]
    fn f_formatting() {
        assert_eq!(format_f(0.0), "0.000000");
        assert_eq!(format_f(26.100768), "26.100768");
        assert_eq!(format_f(-1.5), "-1.500000");
    }
}
