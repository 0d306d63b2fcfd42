//! Interning for every string stored in a document.
//!
//! Strings are copied into a `typed_arena::Arena<u8>` and never freed
//! until the pool itself is dropped, so the `&str` handed out by
//! `intern` stays valid for as long as the pool is borrowed.
//!
//! Text node content is not interned. It lives in a `TextBuffer` from the
//! same arena so that merging neighbouring text grows it in place.

use std::borrow::Borrow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::ptr::{self, NonNull};
use std::{fmt, iter, slice, str};

use typed_arena::Arena;

/// A pointer to string data owned by a `StringPool` (or, for lookups
/// only, by the caller).
#[derive(Copy, Clone)]
pub struct InternedString {
    slice: *const str,
}

impl InternedString {
    /// Wraps an existing string without copying it. Only valid while
    /// `s` is alive; used for temporary lookup keys.
    pub fn from_str(s: &str) -> InternedString {
        InternedString { slice: s as *const str }
    }

    pub fn as_slice<'s>(&self) -> &'s str {
        // The pool never frees or mutates interned bytes.
        unsafe { &*self.slice }
    }
}

impl fmt::Debug for InternedString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.as_slice().fmt(f)
    }
}

impl PartialEq for InternedString {
    fn eq(&self, other: &InternedString) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for InternedString {}

impl Hash for InternedString {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.as_slice().hash(state)
    }
}

impl Borrow<str> for InternedString {
    fn borrow(&self) -> &str {
        self.as_slice()
    }
}

pub struct StringPool {
    bytes: Arena<u8>,
    index: RefCell<HashSet<InternedString>>,
}

impl StringPool {
    pub fn new() -> StringPool {
        StringPool {
            bytes: Arena::new(),
            index: RefCell::new(HashSet::new()),
        }
    }

    pub fn intern<'s>(&'s self, s: &str) -> &'s str {
        if s.is_empty() {
            return "";
        }

        if let Some(existing) = self.index.borrow().get(s) {
            return existing.as_slice();
        }

        let interned: &'s str = self.bytes.alloc_str(s);
        self.index
            .borrow_mut()
            .insert(InternedString::from_str(interned));
        interned
    }

    /// A buffer holding exactly `s`, with no room to grow yet.
    pub fn text(&self, s: &str) -> TextBuffer {
        if s.is_empty() {
            return TextBuffer::default();
        }

        let len = s.len();
        TextBuffer {
            base: self.bytes.alloc_str(s).as_mut_ptr(),
            capacity: len,
            start: 0,
            end: len,
        }
    }

    pub fn text_append(&self, text: &mut TextBuffer, tail: &str) {
        if text.capacity - text.end < tail.len() {
            self.regrow(text, tail.len());
        }
        // The destination lies outside the bytes handed out so far.
        unsafe { ptr::copy(tail.as_ptr(), text.base.add(text.end), tail.len()) };
        text.end += tail.len();
    }

    pub fn text_prepend(&self, text: &mut TextBuffer, head: &str) {
        if text.start < head.len() {
            self.regrow(text, head.len());
        }
        text.start -= head.len();
        unsafe { ptr::copy(head.as_ptr(), text.base.add(text.start), head.len()) };
    }

    /// Copies the content into a new allocation with at least `extra`
    /// free bytes on each side. The old allocation is left untouched.
    fn regrow(&self, text: &mut TextBuffer, extra: usize) {
        let len = text.len();
        let capacity = 2 * (len + extra) + 16;
        let start = (capacity - len) / 2;

        let base = self
            .bytes
            .alloc_extend(iter::repeat(0).take(capacity))
            .as_mut_ptr();
        unsafe { ptr::copy_nonoverlapping(text.base.add(text.start), base.add(start), len) };

        *text = TextBuffer {
            base,
            capacity,
            start,
            end: start + len,
        };
    }

    #[cfg(test)]
    fn owns(&self, s: &str) -> bool {
        self.index
            .borrow()
            .get(s)
            .map_or(false, |i| std::ptr::eq(i.as_slice().as_ptr(), s.as_ptr()))
    }
}

/// Text that grows at either end without moving what was handed out.
///
/// The content sits inside an arena allocation with spare room on both
/// sides. Growing writes into that room; a side that runs out moves the
/// content to an allocation twice the size. Bytes inside `start..end` are
/// never written again, so every `&str` returned earlier stays valid.
pub struct TextBuffer {
    base: *mut u8,
    capacity: usize,
    start: usize,
    end: usize,
}

impl TextBuffer {
    pub fn as_str<'s>(&self) -> &'s str {
        unsafe {
            let bytes = slice::from_raw_parts(self.base.add(self.start), self.len());
            str::from_utf8_unchecked(bytes)
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }
}

impl Default for TextBuffer {
    fn default() -> TextBuffer {
        TextBuffer {
            base: NonNull::dangling().as_ptr(),
            capacity: 0,
            start: 0,
            end: 0,
        }
    }
}

impl fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

impl Default for StringPool {
    fn default() -> StringPool {
        StringPool::new()
    }
}

#[cfg(test)]
mod test {
    use super::StringPool;

    #[test]
    fn keeps_the_same_string() {
        let s = StringPool::new();

        let interned = s.intern("hello");

        assert_eq!(interned, "hello");
    }

    #[test]
    fn copies_the_input_into_the_pool() {
        let s = StringPool::new();
        let input = String::from("hello");

        let interned = s.intern(&input);

        assert_ne!(input.as_ptr(), interned.as_ptr());
        assert!(s.owns(interned));
        assert!(!s.owns(&input));
    }

    #[test]
    fn shares_storage_for_repeated_input() {
        let s = StringPool::new();

        let first = s.intern("world");
        let second = s.intern("world");

        assert_eq!(first.as_ptr(), second.as_ptr());
    }

    #[test]
    fn outlives_the_input_string() {
        let s = StringPool::new();

        let interned = {
            let allocated = String::from("green");
            s.intern(&allocated)
        };

        assert_eq!(interned, "green");
    }

    #[test]
    fn empty_strings_are_not_stored() {
        let s = StringPool::new();

        assert_eq!(s.intern(""), "");
        assert!(!s.owns(""));
    }

    #[test]
    fn text_grows_at_both_ends() {
        let s = StringPool::new();
        let mut text = s.text("mid");

        s.text_append(&mut text, "dle");
        s.text_prepend(&mut text, "the ");
        s.text_append(&mut text, "");

        assert_eq!(text.as_str(), "the middle");
    }

    #[test]
    fn earlier_text_survives_growth() {
        let s = StringPool::new();
        let mut text = s.text("one");
        let before = text.as_str();

        for _ in 0..100 {
            s.text_append(&mut text, " more");
            s.text_prepend(&mut text, "and ");
        }

        assert_eq!(before, "one");
        assert_eq!(text.len(), 3 + 100 * 9);
        assert!(text.as_str().starts_with("and and "));
        assert!(text.as_str().ends_with(" more more"));
    }

    #[test]
    fn text_can_grow_from_its_own_content() {
        let s = StringPool::new();
        let mut text = s.text("ab");

        for _ in 0..5 {
            let current = text.as_str();
            s.text_append(&mut text, current);
        }

        assert_eq!(text.as_str(), "ab".repeat(32));
    }

    #[test]
    fn repeated_merges_use_linear_space() {
        let s = StringPool::new();
        let piece = "x".repeat(100);
        let mut appended = s.text("");
        let mut prepended = s.text("");

        for _ in 0..2000 {
            s.text_append(&mut appended, &piece);
            s.text_prepend(&mut prepended, &piece);
        }

        assert_eq!(appended.len(), 200_000);
        assert_eq!(prepended.len(), 200_000);
        assert!(s.bytes.len() < 16 * 200_000, "arena holds {} bytes", s.bytes.len());
    }

    #[test]
    fn empty_text_is_not_stored() {
        let s = StringPool::new();
        let text = s.text("");

        assert_eq!(text.as_str(), "");
        assert_eq!(s.bytes.len(), 0);
    }

    fn return_populated_pool() -> (StringPool, *const u8) {
        let s = StringPool::new();
        let ptr = s.intern("hello").as_ptr();
        (s, ptr)
    }

    #[test]
    fn survives_being_moved() {
        let (s, ptr) = return_populated_pool();
        assert_eq!(s.intern("hello").as_ptr(), ptr);
    }
}
