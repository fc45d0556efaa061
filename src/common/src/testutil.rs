use crate::{Attribute, DataType, Field, TableSchema, Tuple};
use itertools::izip;
use rand::distributions::Alphanumeric;
use rand::{
    distributions::{Distribution, Uniform},
    thread_rng, Rng,
};
use std::env;
use std::path::PathBuf;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn gen_uniform_strings(n: u64, cardinality: Option<u64>, min: usize, max: usize) -> Vec<Field> {
    let mut rng = rand::thread_rng();
    let mut ret: Vec<Field> = Vec::new();
    if let Some(card) = cardinality {
        let values: Vec<Field> = (0..card)
            .map(|_| Field::StringField(gen_rand_string_range(min, max)))
            .collect();
        let uniform = Uniform::new(0, values.len());
        for _ in 0..n {
            let idx = uniform.sample(&mut rng);
            ret.push(values[idx].clone())
        }
    } else {
        for _ in 0..n {
            ret.push(Field::StringField(gen_rand_string_range(min, max)))
        }
    }
    ret
}

/// Generates `n` int fields. With a cardinality the values are drawn from `0..card`,
/// and when `n == card` every value appears exactly once in order.
pub fn gen_uniform_ints(n: u64, cardinality: Option<u64>) -> Vec<Field> {
    let mut rng = rand::thread_rng();
    let mut ret = Vec::new();
    if let Some(card) = cardinality {
        if card > i32::MAX as u64 {
            panic!("Cardinality larger than i32 max")
        }
        if n == card {
            for i in 0..card as i32 {
                ret.push(Field::IntField(i));
            }
        } else {
            let range = Uniform::new_inclusive(0, card as i32 - 1);
            for _ in 0..n {
                ret.push(Field::IntField(range.sample(&mut rng)));
            }
        }
    } else {
        for _ in 0..n {
            ret.push(Field::IntField(rng.gen::<i32>()));
        }
    }
    ret
}

/// Schema matching the tuples built by `gen_test_tuples`.
pub fn gen_schema_for_test_tuples() -> TableSchema {
    TableSchema::from_vecs(
        vec!["id", "ia1", "ia2", "sa1"],
        vec![DataType::Int, DataType::Int, DataType::Int, DataType::String],
    )
}

/// Generates `n` tuples of the form (distinct id, int with 10 values, int with 100 values,
/// string with 5 values).
pub fn gen_test_tuples(n: u64) -> Vec<Tuple> {
    let keys = gen_uniform_ints(n, Some(n));
    let i1 = gen_uniform_ints(n, Some(10));
    let i2 = gen_uniform_ints(n, Some(100));
    let s1 = gen_uniform_strings(n, Some(5), 1, 4);
    let mut tuples = Vec::new();
    for (k, a, b, c) in izip!(keys, i1, i2, s1) {
        tuples.push(Tuple::new(vec![k, a, b, c]));
    }
    tuples
}

/// Converts an int vector to a Tuple.
///
/// # Argument
///
/// * `data` - Data to put into tuple.
pub fn int_vec_to_tuple(data: Vec<i32>) -> Tuple {
    let mut tuple_data = Vec::new();

    for val in data {
        tuple_data.push(Field::IntField(val));
    }

    Tuple::new(tuple_data)
}

/// Creates a Vec of tuples containing IntFields given a 2D Vec of i32 's
pub fn create_tuple_list(tuple_data: Vec<Vec<i32>>) -> Vec<Tuple> {
    let mut tuples = Vec::new();
    for item in &tuple_data {
        let fields = item.iter().map(|i| Field::IntField(*i)).collect();
        tuples.push(Tuple::new(fields));
    }
    tuples
}

/// Creates a new table schema for a table with width number of IntFields.
pub fn get_int_table_schema(width: usize) -> TableSchema {
    let mut attrs = Vec::new();
    for _ in 0..width {
        attrs.push(Attribute::new(String::new(), DataType::Int))
    }
    TableSchema::new(attrs)
}

pub fn gen_rand_string_range(min: usize, max: usize) -> String {
    if min >= max {
        return gen_rand_string(min);
    }
    let mut rng = rand::thread_rng();
    let size = rng.gen_range(min..max);
    gen_rand_string(size)
}

pub fn gen_rand_string(n: usize) -> String {
    thread_rng()
        .sample_iter(Alphanumeric)
        .take(n)
        .map(char::from)
        .collect()
}

/// Returns a fresh path under the system temp dir. The directory is not created.
pub fn gen_random_dir() -> PathBuf {
    init();
    let mut dir = env::temp_dir();
    dir.push(String::from("crusty"));
    let rand_string = gen_rand_string(10);
    dir.push(rand_string);
    dir
}
