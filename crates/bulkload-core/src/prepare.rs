use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::record::Record;
use crate::schema::Field;
use crate::value::Value;

/// Convert a record into store-ready values for `fields`, in that order.
///
/// The record's pre-persist hook, if any, runs once before extraction.
pub fn prepare<R>(fields: &[&Field], record: &mut R, dialect: &dyn Dialect) -> Result<Vec<Value>>
where
    R: Record + ?Sized,
{
    if let Some(hook) = record.as_preparable() {
        hook.pre_persist().map_err(|err| match err {
            Error::PrePersist(_) => err,
            other => Error::PrePersist(other.to_string()),
        })?;
    }

    fields
        .iter()
        .map(|field| {
            let raw = record.attribute(&field.name).unwrap_or(Value::Null);
            field.encode(raw, dialect)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::GenericDialect;
    use crate::record::{DynamicRecord, Preparable};
    use crate::schema::FieldType;

    struct Slugged {
        title: String,
        slug: Option<String>,
        hook_calls: usize,
    }

    impl Record for Slugged {
        fn attribute(&self, name: &str) -> Option<Value> {
            match name {
                "title" => Some(Value::from(self.title.clone())),
                "slug" => Some(Value::from(self.slug.clone())),
                _ => None,
            }
        }

        fn as_preparable(&mut self) -> Option<&mut dyn Preparable> {
            Some(self)
        }
    }

    impl Preparable for Slugged {
        fn pre_persist(&mut self) -> Result<()> {
            self.hook_calls += 1;
            if self.title.is_empty() {
                return Err(Error::Configuration("title required".to_string()));
            }
            self.slug = Some(self.title.to_lowercase().replace(' ', "-"));
            Ok(())
        }
    }

    #[test]
    fn runs_hook_before_extraction() {
        let title = Field::new("title", FieldType::Text);
        let slug = Field::new("slug", FieldType::Text);
        let mut record = Slugged {
            title: "Hello World".to_string(),
            slug: None,
            hook_calls: 0,
        };

        let values = prepare(&[&slug, &title], &mut record, &GenericDialect::default())
            .expect("prepare");
        assert_eq!(values, vec![Value::from("hello-world"), Value::from("Hello World")]);
        assert_eq!(record.hook_calls, 1);
    }

    #[test]
    fn hook_failures_are_encoding_errors() {
        let title = Field::new("title", FieldType::Text);
        let mut record = Slugged {
            title: String::new(),
            slug: None,
            hook_calls: 0,
        };
        let err = prepare(&[&title], &mut record, &GenericDialect::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Encoding);
    }

    #[test]
    fn missing_attributes_are_null() {
        let name = Field::new("name", FieldType::Text);
        let mut record = DynamicRecord::new();
        let values = prepare(&[&name], &mut record, &GenericDialect::default()).unwrap();
        assert_eq!(values, vec![Value::Null]);
    }
}
