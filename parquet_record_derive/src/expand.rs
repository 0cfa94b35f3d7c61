use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Index, Lit, Meta, NestedMeta, Type};

/// One struct field, however it's accessed (`self.name` for a named field, `self.0` for a
/// tuple field) and whatever name the Schema Compiler should know it by (the identifier's
/// text, or the tuple position stringified, matching `record_persist_derive`'s own
/// `format!("{}_{}", prefix, index)` positional naming for `Fields::Unnamed`).
struct FieldInfo<'a> {
    access: proc_macro2::TokenStream,
    name: String,
    ty: &'a Type,
    attrs: FieldAttributes,
}

pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let data = match &input.data {
        Data::Struct(data) => data,
        _ => {
            return syn::Error::new_spanned(name, "Record can only be derived for structs")
                .to_compile_error()
                .into()
        }
    };

    let fields: Vec<FieldInfo> = match &data.fields {
        Fields::Named(fields) => fields
            .named
            .iter()
            .map(|f| {
                let ident = f.ident.as_ref().expect("named field");
                FieldInfo { access: quote! { #ident }, name: ident.to_string(), ty: &f.ty, attrs: parse_field_attributes(&f.attrs) }
            })
            .collect(),
        Fields::Unnamed(fields) => fields
            .unnamed
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let index = Index::from(i);
                FieldInfo { access: quote! { #index }, name: i.to_string(), ty: &f.ty, attrs: parse_field_attributes(&f.attrs) }
            })
            .collect(),
        Fields::Unit => {
            return syn::Error::new_spanned(name, "Record cannot be derived for a unit struct")
                .to_compile_error()
                .into()
        }
    };
    let is_tuple = matches!(&data.fields, Fields::Unnamed(_));

    let descriptor_entries = fields.iter().map(|f| {
        let field_name = &f.name;
        let ty = f.ty;
        let alias = match &f.attrs.alias {
            Some(a) => quote! { Some(#a.to_string()) },
            None => quote! { None },
        };
        let not_null = f.attrs.not_null;
        let field_id = match f.attrs.field_id {
            Some(id) => quote! { Some(#id) },
            None => quote! { None },
        };
        quote! {
            ::parquet_record::FieldDescriptor::new(#field_name, <#ty as ::parquet_record::ParquetField>::describe(false))
                .with_alias(#alias)
                .with_not_null(#not_null)
                .with_field_id(#field_id)
        }
    });

    let append_stmts = fields.iter().map(|f| {
        let access = &f.access;
        quote! {
            self.#access.append(asm, def_level, rep_level)?;
        }
    });

    let leaf_count_terms = fields.iter().map(|f| {
        let ty = f.ty;
        quote! { <#ty as ::parquet_record::ParquetField>::leaf_count() }
    });

    let from_value_exprs: Vec<_> = fields
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let ty = f.ty;
            quote! { ::parquet_record::materializer::materialize_field::<#ty>(value, &projected.fields[#i])? }
        })
        .collect();

    let default_exprs: Vec<_> = fields
        .iter()
        .map(|f| {
            let ty = f.ty;
            quote! { <#ty as ::parquet_record::ParquetField>::default_for_absent()? }
        })
        .collect();

    let (from_value_body, default_body) = if is_tuple {
        (quote! { Self( #(#from_value_exprs),* ) }, quote! { Self( #(#default_exprs),* ) })
    } else {
        let idents: Vec<_> = fields.iter().map(|f| &f.access).collect();
        (
            quote! { Self { #(#idents: #from_value_exprs),* } },
            quote! { Self { #(#idents: #default_exprs),* } },
        )
    };

    let container_attrs = parse_container_attributes(&input.attrs);
    let table_name = container_attrs.table.unwrap_or_else(|| to_snake_case(&name.to_string()));

    let record_name = name.to_string();

    let expanded = quote! {
        impl ::parquet_record::ParquetField for #name {
            fn describe(nullable: bool) -> ::parquet_record::TypeDescriptor {
                ::parquet_record::TypeDescriptor::Record {
                    name: #record_name.to_string(),
                    fields: vec![ #(#descriptor_entries),* ],
                    nullable,
                }
            }

            fn append(&self, asm: &mut ::parquet_record::assembler::RecordAssembler, def_level: i16, rep_level: i16) -> ::parquet_record::Result<()> {
                #(#append_stmts)*
                Ok(())
            }

            fn leaf_count() -> usize {
                0 #(+ #leaf_count_terms)*
            }

            fn from_value(value: &::parquet_record::materializer::Value, plan: &::parquet_record::schema::FieldPlan) -> ::parquet_record::Result<Self> {
                let ::parquet_record::schema::FieldPlan::Record(projected) = plan else {
                    return Err(::parquet_record::PersistError::Other(format!("expected a Record field plan for {}", #record_name)));
                };
                Ok(#from_value_body)
            }

            fn default_for_absent() -> ::parquet_record::Result<Self> {
                Ok(#default_body)
            }
        }

        impl ::parquet_record::Record for #name {
            fn table_name() -> &'static str {
                #table_name
            }
        }
    };

    TokenStream::from(expanded)
}

struct FieldAttributes {
    alias: Option<String>,
    not_null: bool,
    field_id: Option<i32>,
}

struct ContainerAttributes {
    table: Option<String>,
}

/// Parses `#[parquet(alias = "...", id = N, not_null)]` off a struct field, in the same
/// `parse_meta`/`NestedMeta` style the teacher's `parse_persist_attributes` uses.
fn parse_field_attributes(attrs: &[Attribute]) -> FieldAttributes {
    let mut result = FieldAttributes { alias: None, not_null: false, field_id: None };

    for attr in attrs {
        if !attr.path.is_ident("parquet") {
            continue;
        }
        let Ok(Meta::List(meta_list)) = attr.parse_meta() else { continue };
        for nested_meta in meta_list.nested {
            match nested_meta {
                NestedMeta::Meta(Meta::NameValue(nv)) => {
                    if nv.path.is_ident("alias") {
                        if let Lit::Str(lit_str) = &nv.lit {
                            result.alias = Some(lit_str.value());
                        }
                    } else if nv.path.is_ident("id") {
                        if let Lit::Int(lit_int) = &nv.lit {
                            result.field_id = lit_int.base10_parse::<i32>().ok();
                        }
                    }
                }
                NestedMeta::Meta(Meta::Path(path)) => {
                    if path.is_ident("not_null") {
                        result.not_null = true;
                    }
                }
                _ => {}
            }
        }
    }

    result
}

/// Parses `#[parquet(table = "...")]` off the struct itself.
fn parse_container_attributes(attrs: &[Attribute]) -> ContainerAttributes {
    let mut result = ContainerAttributes { table: None };

    for attr in attrs {
        if !attr.path.is_ident("parquet") {
            continue;
        }
        let Ok(Meta::List(meta_list)) = attr.parse_meta() else { continue };
        for nested_meta in meta_list.nested {
            if let NestedMeta::Meta(Meta::NameValue(nv)) = nested_meta {
                if nv.path.is_ident("table") {
                    if let Lit::Str(lit_str) = &nv.lit {
                        result.table = Some(lit_str.value());
                    }
                }
            }
        }
    }

    result
}

/// Compile-time duplicate of `config::to_snake_case`: macro expansion runs before the crate
/// it's attached to is compiled, so it can't call into `parquet_record` for this.
fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.char_indices() {
        if ch.is_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
