//! Integration tests for the reader entry points.

use polyparse::prelude::*;
use polyparse::utils::location::SourceMap;

/// Every integer point of `[lo, hi]^n`.
fn grid(n: usize, lo: i64, hi: i64) -> Vec<Vec<Int>> {
    let mut points = vec![Vec::new()];
    for _ in 0..n {
        let mut next = Vec::new();
        for p in &points {
            for v in lo..=hi {
                let mut q = p.clone();
                q.push(int(v));
                next.push(q);
            }
        }
        points = next;
    }
    points
}

/// Print `map`, read it back and compare membership on a grid.
fn assert_round_trip(source: &str, lo: i64, hi: i64) {
    let map = read_map(source).expect("Failed to read");
    let text = map.to_string();
    let back = read_map(&text).unwrap_or_else(|e| panic!("Failed to re-read {}: {}", text, e));
    assert_eq!(back.space().total(), map.space().total(), "{}", text);
    for p in grid(map.space().total(), lo, hi) {
        assert_eq!(map.contains(&p).unwrap(), back.contains(&p).unwrap(), "{} at {:?}", text, p);
    }
}

#[test]
fn test_round_trip_sets() {
    assert_round_trip("{ [i] : 0 <= i <= 10 and i % 3 = 1 }", -4, 12);
    assert_round_trip("{ [i, j] : exists (a : i = 2a and j >= a) }", -5, 5);
    assert_round_trip("{ [i] : i >= 5 or i <= -2 }", -6, 6);
    assert_round_trip("{ [i, j] : i + j >= 2 and not (i = j) }", -3, 3);
}

#[test]
fn test_round_trip_relations() {
    assert_round_trip("[N] -> { S[i] -> T[j] : 0 <= i < N and j = [i/2] }", -3, 6);
    assert_round_trip("{ [i] -> [j] : j = min(i, 2) }", -4, 4);
    assert_round_trip("{ [[a] -> [b]] -> [c] : c = a - b }", -3, 3);
}

#[test]
fn test_round_trip_pw_aff() {
    let pa = read_pw_aff("[N] -> { [i] -> [floord(i + N, 3)] : i >= 0; [i] -> [-i] : i < 0 }").unwrap();
    let back = read_pw_aff(&pa.to_string()).unwrap();
    for p in grid(2, -5, 5) {
        assert_eq!(pa.eval(&p).unwrap(), back.eval(&p).unwrap(), "{} at {:?}", pa, p);
    }
}

#[test]
fn test_round_trip_union() {
    let umap = read_union_map("{ A[i] : 0 <= i < 3; B[i, j] : i = j }").unwrap();
    let back = read_union_map(&umap.to_string()).unwrap();
    assert_eq!(back.n_map(), 2);
    for (a, b) in umap.maps().iter().zip(back.maps()) {
        assert!(a.space().is_equal(b.space()));
        for p in grid(a.space().total(), -2, 4) {
            assert_eq!(a.contains(&p).unwrap(), b.contains(&p).unwrap());
        }
    }
}

#[test]
fn test_equal_divisions_are_shared() {
    let set = read_set("{ [i] : [i/2] + [i/2] = [i/4] + 3 }").unwrap();
    for bmap in set.basic_maps() {
        let ls = bmap.local_space();
        assert!(ls.n_div() <= 2);
        for k in 0..ls.n_div() {
            assert!(ls.div_is_known(k));
        }
    }
}

#[test]
fn test_even_and_odd_partition() {
    let even = read_set("{ [i] : exists (a : i = 2a) }").unwrap();
    let odd = read_set("{ [i] : i % 2 = 1 }").unwrap();
    for p in grid(1, -9, 9) {
        assert_ne!(even.contains(&p).unwrap(), odd.contains(&p).unwrap());
    }
}

#[test]
fn test_piecewise_domain_gap() {
    let pa = read_pw_aff("{ [i] -> [i] : i > 0; [i] -> [0] : i < 0 }").unwrap();
    assert!(pa.eval(&[int(0)]).unwrap().is_none());
    assert_eq!(pa.eval(&[int(4)]).unwrap().map(|v| v.to_integer()), Some(int(4)));
}

#[test]
fn test_config_controls_division_order() {
    let source = "{ [i, j] : [j/3] + [i/2] = 1 }";
    let sorted = read_map_with(source, &Config::default()).unwrap();
    let unsorted = read_map_with(source, &Config::default().with_sort_divs(false)).unwrap();
    for p in grid(2, -4, 4) {
        assert_eq!(sorted.contains(&p).unwrap(), unsorted.contains(&p).unwrap());
    }
}

#[test]
fn test_error_reporting() {
    let err = read_map("{ [i] : i < M }").unwrap_err();
    assert!(matches!(err, PolyError::Semantic(_)));
    let span = err.span().unwrap();
    let snippet = SourceMap::new("{ [i] : i < M }").snippet(&span).unwrap();
    assert_eq!(snippet, "{ [i] : i < M }\n            ^");

    let err = read_map("{ [i] : i @ 2 }").unwrap_err();
    assert!(matches!(err, PolyError::Lexer(_)));

    let err = read_map("{ [i] : not exists (a : i <= 3a <= i + 5) }").unwrap_err();
    assert!(matches!(err, PolyError::Unsupported(_)));

    assert!(read_set("{ [i] -> [j] }").is_err());
    assert!(read_map("{ [i] ; [i] -> [j] }").is_err());
}

#[test]
fn test_json_round_trip() {
    let map = read_map("[N] -> { S[i] -> [j] : j = [i/3] and i < N }").unwrap();
    let json = serde_json::to_string(&map).unwrap();
    let back: Map = serde_json::from_str(&json).unwrap();
    assert_eq!(back, map);
}
