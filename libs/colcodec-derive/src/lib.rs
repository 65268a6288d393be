use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, GenericParam, LitStr, parse_macro_input, parse_quote};

/// Derive `colcodec::ParquetType` for a struct with named fields.
///
/// The struct becomes a record: it encodes to a `Row` with one field per
/// struct field in declaration order, and its schema is a group of the
/// fields' schemas. `Option<_>` fields become optional columns.
///
/// # Example
///
/// ```ignore
/// #[derive(ParquetRecord)]
/// pub struct Order {
///     pub id: i64,
///     #[parquet(rename = "customer_name")]
///     pub customer: Option<String>,
///     pub lines: Vec<OrderLine>,
/// }
/// ```
#[proc_macro_derive(ParquetRecord, attributes(parquet))]
pub fn derive_parquet_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

struct RecordField {
    ident: syn::Ident,
    column: String,
    ty: syn::Type,
}

fn derive_impl(mut input: DeriveInput) -> Result<proc_macro2::TokenStream, syn::Error> {
    let name = input.ident.clone();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &name,
                    "ParquetRecord only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &name,
                "ParquetRecord only supports structs",
            ));
        }
    };

    let mut record_fields = Vec::with_capacity(fields.len());
    for field in fields {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected named field"))?;

        let mut column: Option<String> = None;
        for attr in &field.attrs {
            if !attr.path().is_ident("parquet") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value: LitStr = meta.value()?.parse()?;
                    column = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error("unknown parquet attribute (expected `rename`)"))
                }
            })?;
        }

        let column =
            column.unwrap_or_else(|| ident.to_string().trim_start_matches("r#").to_string());
        if record_fields.iter().any(|f: &RecordField| f.column == column) {
            return Err(syn::Error::new_spanned(
                &ident,
                format!("duplicate column name '{column}'"),
            ));
        }
        record_fields.push(RecordField {
            ident,
            column,
            ty: field.ty.clone(),
        });
    }

    for param in &mut input.generics.params {
        if let GenericParam::Type(ty) = param {
            ty.bounds.push(parse_quote!(::colcodec::codec::ParquetType));
        }
    }
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let descriptors = record_fields.iter().map(|f| {
        let column = &f.column;
        let ty = &f.ty;
        quote! {
            ::colcodec::descriptor::FieldDescriptor::new(
                #column,
                <#ty as ::colcodec::codec::ParquetType>::descriptor(),
            )
        }
    });

    let encoders = record_fields.iter().map(|f| {
        let column = &f.column;
        let ident = &f.ident;
        quote! {
            __row.insert(#column, __ctx.encode_field(#column, &self.#ident)?);
        }
    });

    let decoders = record_fields.iter().map(|f| {
        let column = &f.column;
        let ident = &f.ident;
        quote! {
            #ident: __ctx.decode_field(&mut __row, #column)?,
        }
    });

    let field_count = record_fields.len();

    Ok(quote! {
        impl #impl_generics ::colcodec::codec::ParquetType for #name #ty_generics #where_clause {
            fn descriptor() -> ::colcodec::descriptor::TypeDescriptor {
                ::colcodec::descriptor::TypeDescriptor::record::<Self>(::std::vec![
                    #(#descriptors),*
                ])
            }

            fn encode_value(
                &self,
                __ctx: &::colcodec::codec::Context<'_>,
            ) -> ::colcodec::Result<::colcodec::value::Value> {
                let mut __row = ::colcodec::value::Row::with_capacity(#field_count);
                #(#encoders)*
                ::std::result::Result::Ok(::colcodec::value::Value::Row(__row))
            }

            fn decode_value(
                __value: ::colcodec::value::Value,
                __ctx: &::colcodec::codec::Context<'_>,
            ) -> ::colcodec::Result<Self> {
                let mut __row = ::colcodec::codec::expect_row(__value)?;
                ::std::result::Result::Ok(Self {
                    #(#decoders)*
                })
            }
        }
    })
}
