use sparsify::compact::{compact_path, CompactionMap};
use sparsify::features::{generate, FeatureKind};
use sparsify::sparse::{aggregate, write_line, DocRegistry};
use sparsify::tokenizer::phrases;
use sparsify::vocab::{resolve, MphVocabulary};
use std::fs;

/// Generate, resolve, aggregate and write one document, then compact the
/// result twice against a persisted map.
#[test]
fn corpus_to_compacted_sparse_files() {
    let dir = tempfile::tempdir().unwrap();
    let svm_dir = dir.path().join("svmFiles");
    let small_dir = dir.path().join("smallSvmFiles");
    let map_path = dir.path().join("largeToSmall.map");
    fs::create_dir(&svm_dir).unwrap();

    // Vocabulary built from OSB features so tagged gappy queries also hit it.
    let vocab_tokens: Vec<String> = ["the", "quick", "brown", "fox"]
        .iter()
        .map(|w| w.to_string())
        .collect();
    let vocab = MphVocabulary::build(generate(
        &vocab_tokens,
        2,
        FeatureKind::OrthogonalSparseBigram,
    ));

    let mut registry = DocRegistry::new();
    let doc_id = registry.id_for("doc_a.txt");
    assert_eq!(doc_id, 1);

    let text = "The quick brown fox\nthe quick zebra\n";
    let mut ids = Vec::new();
    let mut dropped = 0;
    for tokens in phrases(text) {
        for feature in generate(&tokens, 2, FeatureKind::OrthogonalSparseBigram) {
            match resolve(&vocab, &feature) {
                Some(id) => ids.push(id),
                None => dropped += 1,
            }
        }
    }
    // "the quick 0"/"the quick 1" occur in both phrases; zebra pairs miss.
    assert!(dropped > 0);
    let vector = aggregate(ids);
    assert!(vector.values().any(|&count| count >= 2));

    let mut buf = Vec::new();
    write_line(&mut buf, doc_id, &vector).unwrap();
    let line = String::from_utf8(buf).unwrap();
    fs::write(svm_dir.join("doc_a.txt"), &line).unwrap();

    // Keys are strictly ascending in the serialized line.
    let keys: Vec<i64> = line
        .split_whitespace()
        .skip(1)
        .map(|pair| pair.split_once(':').unwrap().0.parse().unwrap())
        .collect();
    assert!(keys.windows(2).all(|w| w[0] < w[1]));

    let mut map = CompactionMap::load(&map_path).unwrap();
    let report = compact_path(&svm_dir, &mut map, &small_dir, false).unwrap();
    assert_eq!(report.files_processed, 1);
    assert!(report.malformed.is_empty());
    map.persist(&map_path).unwrap();

    let first_pass = fs::read_to_string(small_dir.join("doc_a.txt")).unwrap();

    // Second pass over the same input with the persisted map reuses every id.
    let mut map = CompactionMap::load(&map_path).unwrap();
    let assigned_before = map.len();
    compact_path(&svm_dir, &mut map, &small_dir, false).unwrap();
    assert_eq!(map.len(), assigned_before);
    let second_pass = fs::read_to_string(small_dir.join("doc_a.txt")).unwrap();
    assert_eq!(first_pass, second_pass);
}

/// Tagged gappy bigrams resolve against an OSB-built vocabulary without a
/// separate gappy model being built.
#[test]
fn tagged_gappy_queries_hit_an_osb_vocabulary() {
    let tokens: Vec<String> = ["one", "two", "three"].iter().map(|w| w.to_string()).collect();

    // Tagged gappy features append the configured gap itself, so they line up
    // with OSB emissions one gap wider (OSB's k stops at max_gap - 1).
    let tagged = generate(&tokens, 3, FeatureKind::GappyBigramTagged);
    assert!(tagged.contains(&"one two 3".to_string()));
    let osb = generate(&tokens, 4, FeatureKind::OrthogonalSparseBigram);
    assert!(osb.contains(&"one two 3".to_string()));

    let wide_vocab = MphVocabulary::build(osb);
    for feature in &tagged {
        assert!(
            resolve(&wide_vocab, feature).is_some(),
            "tagged feature {feature:?} should hit the wider OSB vocabulary"
        );
    }
}
