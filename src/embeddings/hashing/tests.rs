use super::*;

fn magnitude(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

#[test]
fn string_hash_matches_polynomial_hash() {
    assert_eq!(string_hash(""), 0);
    assert_eq!(string_hash("a"), 97);
    assert_eq!(string_hash("ab"), 97 * 31 + 98);
    assert_eq!(string_hash("hello"), 99_162_322);
}

#[test]
fn string_hash_wraps_to_i32_min() {
    // Well-known input whose 32-bit polynomial hash is exactly i32::MIN
    assert_eq!(string_hash("polygenelubricants"), i32::MIN);

    let embedder = HashingEmbedder::default();
    assert_eq!(embedder.bucket("polygenelubricants"), 248);
}

#[test]
fn tokenize_lowercases_and_splits_on_punctuation() {
    assert_eq!(
        tokenize("Hostel FEES, due-date: 1st_of month!"),
        vec!["hostel", "fees", "due", "date", "1st_of", "month"]
    );
    assert!(tokenize("  ... !!! ").is_empty());
}

#[test]
fn embedding_has_fixed_dimension() {
    let embedder = HashingEmbedder::default();
    assert_eq!(embedder.dimension(), DEFAULT_EMBEDDING_DIMENSION);
    assert_eq!(embedder.embed("").len(), 300);
    assert_eq!(embedder.embed("exam schedule").len(), 300);

    let small = HashingEmbedder::new(64);
    assert_eq!(small.embed("exam schedule").len(), 64);
}

#[test]
fn embedding_is_deterministic() {
    let embedder = HashingEmbedder::default();
    for text in ["", "When is the fee deadline?", "Library hours are 9 to 5."] {
        let first = embedder.embed(text);
        let second = embedder.embed(text);
        let first_bits: Vec<u32> = first.iter().map(|v| v.to_bits()).collect();
        let second_bits: Vec<u32> = second.iter().map(|v| v.to_bits()).collect();
        assert_eq!(first_bits, second_bits);
    }
}

#[test]
fn embedding_counts_token_buckets() {
    let embedder = HashingEmbedder::default();
    let vector = embedder.embed("Hello hello WORLD");

    let expected_hello = 2.0 / 5.0_f32.sqrt();
    let expected_world = 1.0 / 5.0_f32.sqrt();
    assert!((vector[22] - expected_hello).abs() < 1e-6);
    assert!((vector[102] - expected_world).abs() < 1e-6);
    assert_eq!(vector.iter().filter(|v| **v != 0.0).count(), 2);
}

#[test]
fn embedding_is_unit_length() {
    let embedder = HashingEmbedder::default();
    let vector = embedder.embed("Admissions open in June for all engineering branches.");
    assert!((magnitude(&vector) - 1.0).abs() < 1e-5);
}

#[test]
fn empty_text_embeds_to_zero_vector() {
    let embedder = HashingEmbedder::default();
    for text in ["", "   ", "?!..."] {
        let vector = embedder.embed(text);
        assert!(vector.iter().all(|v| *v == 0.0));
        assert!(vector.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn zero_dimension_is_clamped() {
    let embedder = HashingEmbedder::new(0);
    assert_eq!(embedder.dimension(), 1);
    assert_eq!(embedder.embed("anything goes"), vec![1.0]);
}

#[test]
fn cosine_similarity_of_identical_vectors_is_one() {
    let embedder = HashingEmbedder::default();
    let vector = embedder.embed("hostel curfew is at ten");
    assert!((cosine_similarity(&vector, &vector) - 1.0).abs() < 1e-6);
}

#[test]
fn cosine_similarity_is_symmetric() {
    let embedder = HashingEmbedder::default();
    let a = embedder.embed("semester exam timetable");
    let b = embedder.embed("exam fees and timetable changes");
    assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));

    let c = [0.3, -0.2, 0.9];
    let d = [0.1, 0.5, -0.4];
    assert_eq!(cosine_similarity(&c, &d), cosine_similarity(&d, &c));
}

#[test]
fn cosine_similarity_with_zero_vector_is_zero() {
    let zero = vec![0.0; 4];
    let other = vec![0.5, 0.5, 0.5, 0.5];
    assert_eq!(cosine_similarity(&zero, &other), 0.0);
    assert_eq!(cosine_similarity(&other, &zero), 0.0);
    assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    assert!(!cosine_similarity(&zero, &zero).is_nan());
}

#[test]
fn cosine_similarity_of_orthogonal_vectors() {
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
}

#[test]
fn related_texts_score_higher_than_unrelated() {
    let embedder = HashingEmbedder::default();
    let query = embedder.embed("hostel fee deadline");
    let related = embedder.embed("The hostel fee deadline is the fifth of every month.");
    let unrelated = embedder.embed("Robotics club meets on Fridays in lab three.");

    assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
}
