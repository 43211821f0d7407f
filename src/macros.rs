// Shorthand for return Err(ProbeError::new(ErrorKind::Foo))
//
// Usage:
// - err!(Variant)          -> return Err(ProbeError::new(ErrorKind::Variant))
// - err!(Variant(Message)) -> return Err(ProbeError::new(ErrorKind::Variant(Message)))
macro_rules! err {
	($variant:ident) => {
		return Err(crate::error::ProbeError::new(
			crate::error::ErrorKind::$variant,
		))
	};
	($variant:ident($reason:expr)) => {
		return Err(crate::error::ProbeError::new(
			crate::error::ErrorKind::$variant($reason),
		))
	};
}

pub(crate) use err;
