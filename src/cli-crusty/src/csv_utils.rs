use common::{Attribute, CrustyError, DataType, Field, TableSchema, Tuple};
use log::{debug, info};
use queryexe::opiterator::TupleIterator;

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Parses a schema given as `name:type` pairs separated by commas, e.g. `id:int,name:string`.
pub fn parse_schema(spec: &str) -> Result<TableSchema, CrustyError> {
    let mut attributes = Vec::new();
    for column in spec.split(',') {
        let column = column.trim();
        let (name, dtype) = column.split_once(':').ok_or_else(|| {
            CrustyError::ValidationError(format!("column {:?} is not of the form name:type", column))
        })?;
        let dtype = match dtype.trim().to_lowercase().as_str() {
            "int" => DataType::Int,
            "string" => DataType::String,
            other => {
                return Err(CrustyError::ValidationError(format!(
                    "unknown type {:?} for column {}",
                    other, name
                )))
            }
        };
        if name.trim().is_empty() {
            return Err(CrustyError::ValidationError(format!(
                "column {:?} has no name",
                column
            )));
        }
        attributes.push(Attribute::new(name.trim().to_string(), dtype));
    }
    Ok(TableSchema::new(attributes))
}

/// Reads header-less CSV records, typing each value by its column in `schema`.
pub fn read_tuples<R: Read>(reader: R, schema: &TableSchema) -> Result<Vec<Tuple>, CrustyError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut tuples = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let rec = result?;
        if rec.len() != schema.size() {
            return Err(CrustyError::ValidationError(format!(
                "record {} has {} values, schema has {}",
                line + 1,
                rec.len(),
                schema.size()
            )));
        }
        let mut tuple = Tuple::new(Vec::with_capacity(rec.len()));
        for (field, attr) in rec.iter().zip(schema.attributes()) {
            match attr.dtype() {
                DataType::Int => {
                    let value: i32 = field.parse::<i32>().map_err(|e| {
                        CrustyError::ValidationError(format!(
                            "record {}: {:?} is not an int for column {}: {}",
                            line + 1,
                            field,
                            attr.name(),
                            e
                        ))
                    })?;
                    tuple.field_vals.push(Field::IntField(value));
                }
                DataType::String => tuple.field_vals.push(Field::StringField(field.to_string())),
            }
        }
        tuples.push(tuple);
    }
    debug!("csv_utils: read {} records", tuples.len());
    Ok(tuples)
}

/// Loads the CSV file at `path` into an in-memory child relation.
pub fn load_table<P: AsRef<Path>>(path: P, schema: TableSchema) -> Result<TupleIterator, CrustyError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let tuples = read_tuples(file, &schema)?;
    info!("Loaded {} records from {}", tuples.len(), path.display());
    Ok(TupleIterator::new(tuples, schema))
}
