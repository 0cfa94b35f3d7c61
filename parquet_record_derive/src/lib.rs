use proc_macro::TokenStream;

mod expand;

/// Derives [`parquet_record::ParquetField`] and [`parquet_record::Record`] for a struct:
/// generates `describe`/`append`/`leaf_count`/`from_value`/`default_for_absent` by
/// delegating to each named field's own `ParquetField` impl, the same way the teacher's
/// `Persistable` derive calls `Field::schema`/`Field::append` on every struct member.
#[proc_macro_derive(Record, attributes(parquet))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    expand::derive_record(input)
}
