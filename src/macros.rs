//! # Internal Macros
//!
//! This module provides internal macros for reducing boilerplate in journaldb.
//!
//! ## forward_record!
//!
//! Cursors that own their backing storage (a `RecordList` owns its arena, a
//! `MultiMap` its entries) act as their own current record. Their `Record`
//! impl builds a borrowed view positioned on the current row and forwards
//! every getter to it.
//!
//! The view type must expose inherent `get_str`, `get_sym` and `get_bin`
//! methods whose results borrow the underlying storage rather than the view
//! itself, so the forwarded reference outlives the temporary view.
//!
//! ### Usage
//!
//! ```ignore
//! forward_record!(RecordList, |this| this.view());
//!
//! // Generates:
//! // impl Record for RecordList {
//! //     fn get_int(&self, col: usize) -> i32 { let this = self; Record::get_int(&this.view(), col) }
//! //     ...
//! // }
//! ```

/// Implements `Record` for `$ty` by forwarding to the view `$view` yields.
macro_rules! forward_record {
    ($ty:ty, |$this:ident| $view:expr) => {
        impl $crate::records::Record for $ty {
            #[inline]
            fn get_bool(&self, col: usize) -> bool {
                let $this = self;
                $crate::records::Record::get_bool(&$view, col)
            }

            #[inline]
            fn get_byte(&self, col: usize) -> i8 {
                let $this = self;
                $crate::records::Record::get_byte(&$view, col)
            }

            #[inline]
            fn get_short(&self, col: usize) -> i16 {
                let $this = self;
                $crate::records::Record::get_short(&$view, col)
            }

            #[inline]
            fn get_int(&self, col: usize) -> i32 {
                let $this = self;
                $crate::records::Record::get_int(&$view, col)
            }

            #[inline]
            fn get_long(&self, col: usize) -> i64 {
                let $this = self;
                $crate::records::Record::get_long(&$view, col)
            }

            #[inline]
            fn get_float(&self, col: usize) -> f32 {
                let $this = self;
                $crate::records::Record::get_float(&$view, col)
            }

            #[inline]
            fn get_double(&self, col: usize) -> f64 {
                let $this = self;
                $crate::records::Record::get_double(&$view, col)
            }

            #[inline]
            fn get_date(&self, col: usize) -> i64 {
                let $this = self;
                $crate::records::Record::get_date(&$view, col)
            }

            fn get_str(&self, col: usize) -> Option<&str> {
                let $this = self;
                $view.get_str(col)
            }

            fn get_sym(&self, col: usize) -> Option<&str> {
                let $this = self;
                $view.get_sym(col)
            }

            fn get_bin(&self, col: usize) -> Option<$crate::records::BinarySequence<'_>> {
                let $this = self;
                $view.get_bin(col)
            }

            fn row_id(&self) -> i64 {
                let $this = self;
                $crate::records::Record::row_id(&$view)
            }
        }
    };
}
