//! Statement parameter binding

use bytes::BytesMut;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

use pgpond_core::SqlParam;

/// Adapter binding a [`SqlParam`] as a tokio-postgres statement parameter.
///
/// Accepts any target type and defers mismatches to the variant's own
/// encoding, so a caller binding `Int` against a text column gets the
/// backend's error rather than a client-side panic.
#[derive(Debug)]
pub(crate) struct PgParam<'a>(pub &'a SqlParam);

impl ToSql for PgParam<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self.0 {
            SqlParam::Null => Ok(IsNull::Yes),
            SqlParam::Bool(v) => v.to_sql(ty, out),
            SqlParam::Int(v) => v.to_sql(ty, out),
            SqlParam::Float(v) => v.to_sql(ty, out),
            SqlParam::Text(v) => v.to_sql(ty, out),
            SqlParam::Bytes(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Wrap a parameter slice for binding
pub(crate) fn wrap(params: &[SqlParam]) -> Vec<PgParam<'_>> {
    params.iter().map(PgParam).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_param_encodes() {
        let param = SqlParam::Int(42);
        let mut buf = BytesMut::new();
        let result = PgParam(&param).to_sql(&Type::INT8, &mut buf);
        assert!(matches!(result, Ok(IsNull::No)));
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn test_null_param_is_null() {
        let param = SqlParam::Null;
        let mut buf = BytesMut::new();
        let result = PgParam(&param).to_sql(&Type::TEXT, &mut buf);
        assert!(matches!(result, Ok(IsNull::Yes)));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_text_param_encodes() {
        let param = SqlParam::Text("hello".into());
        let mut buf = BytesMut::new();
        let result = PgParam(&param).to_sql(&Type::TEXT, &mut buf);
        assert!(matches!(result, Ok(IsNull::No)));
        assert_eq!(&buf[..], b"hello");
    }

    #[test]
    fn test_wrap_preserves_order() {
        let params = vec![SqlParam::Int(1), SqlParam::Text("x".into())];
        let wrapped = wrap(&params);
        assert_eq!(wrapped.len(), 2);
    }
}
