/// Create a content store containing all embedded assets.
///
/// Call this once at startup and share the store (in an `Arc`), since
/// each call decodes all the assets again.
pub fn content_store() -> embedfs::Result<embedfs::ContentStore> {
    let mut store = embedfs::ContentStore::new();
    // From tests/assets/css/style.css
    store.add(embedfs::Content {
        path: "/css/style.css",
        digest: "muZetqwds2y5WYHMmoGY7w",
        modified: 1483228800,
        raw: None,
        compressed: Some("
H4sIAAAAAAACAzWNSw7CMAxE9z2FJdZBaai6SE+TNj+LfFCSCgri7uAg5NXMPD2vWR/wGgCiKg6TBA5q
b3npzYPdUTcvYeImUmVzasyqiOGQUFWqrJqClqYth1wknIQQFFe1XV3Je9Lfziq6ZXgPfuzPuqfi00gY
z/PP/Rfwy0zkrYMBk2HeoPON0ImWDz3EeR6zAAAA"),
    })?;
    // From tests/assets/img/dot.gif
    store.add(embedfs::Content {
        path: "/img/dot.gif",
        digest: "2JdGiI2i2VELZKnwMers1Q",
        modified: 1483228800,
        raw: Some("
R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7"),
        compressed: None,
    })?;
    // From tests/assets/index.html
    store.add(embedfs::Content {
        path: "/index.html",
        digest: "cZibnu0ZwMJ_kcMjNfDvhQ",
        modified: 1483228800,
        raw: None,
        compressed: Some("
H4sIAAAAAAACAy1Puw7CMBDb+YojO0RsDGk3JD6AH0gbt4m4PJQcQv17GmDynW3Zsjm6PMtWQF4ijwfT
gdimdVBIqhOwbocIsTR7WxtkUC9ZTteuShDGeIsTnIMz+vcfDIf0pAoeVJON0TwginzFMqi5Nf1lz/vV
Q/S/Y8pu642X8Q7mTEvNkcSDppBs3XbfZZfL+PChUbEr6G0bzTmWwHAUkuSvvdS8VhvPRpee/o/Vv4Uf
SsL3e/IAAAA"),
    })?;
    // From tests/assets/robots.txt
    store.add(embedfs::Content {
        path: "/robots.txt",
        digest: "tiFtYcA-bODJrqbKeAj3yg",
        modified: 1483228800,
        raw: Some("
VXNlci1hZ2VudDogKgpEaXNhbGxvdzoK"),
        compressed: None,
    })?;
    Ok(store)
}
