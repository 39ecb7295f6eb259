//! Defines a model which can be stored in a document table.

pub trait Storable {
    fn table(&self) -> &'static str;
}

#[macro_export]
macro_rules! make_storable {
    ($ty:ty, $tbl:expr) => {
        impl ::models::storable::Storable for $ty {
            fn table(&self) -> &'static str {
                $tbl
            }
        }
    }
}
