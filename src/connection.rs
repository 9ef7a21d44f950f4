//! Circular byte buffers linking a producing port to its consumers.
//!
//! A writer [`Connection`] owns a zeroed buffer of `capacity` elements. Each
//! consuming input binds a reader [`Connection`] to that same buffer, with its
//! cursor trailing the writer's by `delay` elements. Cursors advance in lock
//! step, one chunk per tick, so the distance never changes and the consumer
//! sees the producer's stream shifted by `delay`.
//!
//! No overrun detection happens here: the plan sizes every buffer so that
//! `capacity >= delay + chunk` before the first tick.

use crate::invariant_ppt::{assert_invariant, DELAY_PREFILLED, DELAY_WITHIN_CAPACITY};
use std::cell::RefCell;
use std::rc::Rc;

type SharedBuffer = Rc<RefCell<Box<[u8]>>>;

/// One end of a circular buffer.
#[derive(Debug, Clone)]
pub struct Connection {
    capacity: usize,
    type_size: usize,
    buffer: SharedBuffer,
    /// Byte offset into `buffer`, always `< capacity * type_size`.
    cursor: usize,
}

impl Connection {
    /// Allocate a zeroed buffer of `capacity` elements of `type_size` bytes.
    ///
    /// # Panics
    /// Panics if either argument is zero.
    pub fn writer(capacity: usize, type_size: usize) -> Self {
        assert!(capacity > 0, "connection capacity must be non-zero");
        assert!(type_size > 0, "element size must be non-zero");
        Self {
            capacity,
            type_size,
            buffer: Rc::new(RefCell::new(vec![0u8; capacity * type_size].into_boxed_slice())),
            cursor: 0,
        }
    }

    /// Bind to `writer`'s buffer, `delay` elements behind its cursor.
    ///
    /// The skipped region is filled with zeros, so the first `delay` reads
    /// are well defined even though nothing has been produced yet.
    ///
    /// # Panics
    /// Panics if `delay >= capacity`.
    pub fn reader(writer: &Connection, delay: usize) -> Self {
        assert_invariant(
            DELAY_WITHIN_CAPACITY,
            delay < writer.capacity,
            "reader delay fits inside the buffer",
            Some("Connection::reader"),
        );
        let len = writer.len_bytes();
        let offset = delay * writer.type_size;
        let cursor = (writer.cursor + len - offset) % len;
        let reader = Self {
            capacity: writer.capacity,
            type_size: writer.type_size,
            buffer: Rc::clone(&writer.buffer),
            cursor,
        };
        reader.fill(offset, 0);
        assert_invariant(
            DELAY_PREFILLED,
            reader.region_is(offset, 0),
            "delay region is zero-filled",
            Some("Connection::reader"),
        );
        reader
    }

    /// Capacity in elements.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes per element.
    pub fn type_size(&self) -> usize {
        self.type_size
    }

    /// Buffer length in bytes; the cursor stays in `0..len_bytes()`.
    pub fn len_bytes(&self) -> usize {
        self.capacity * self.type_size
    }

    /// Current cursor as a byte offset from the buffer start.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Current cursor in elements.
    pub fn position(&self) -> usize {
        self.cursor / self.type_size
    }

    /// Whether both ends refer to the same buffer.
    pub fn shares_buffer(&self, other: &Connection) -> bool {
        Rc::ptr_eq(&self.buffer, &other.buffer)
    }

    /// Copy `count` elements starting at the cursor into `dst`.
    ///
    /// Does not move the cursor; see [`advance`](Self::advance).
    pub fn read(&self, count: usize, dst: &mut [u8]) {
        let n = count * self.type_size;
        let buf = self.buffer.borrow();
        let first = (buf.len() - self.cursor).min(n);
        dst[..first].copy_from_slice(&buf[self.cursor..self.cursor + first]);
        dst[first..n].copy_from_slice(&buf[..n - first]);
    }

    /// Copy whole elements from `src` into the buffer at the cursor.
    ///
    /// Does not move the cursor; see [`advance`](Self::advance).
    pub fn write(&self, src: &[u8]) {
        let mut buf = self.buffer.borrow_mut();
        let first = (buf.len() - self.cursor).min(src.len());
        let cursor = self.cursor;
        buf[cursor..cursor + first].copy_from_slice(&src[..first]);
        buf[..src.len() - first].copy_from_slice(&src[first..]);
    }

    /// Move the cursor forward by `count` elements, wrapping at the end.
    pub fn advance(&mut self, count: usize) {
        self.cursor = (self.cursor + count * self.type_size) % self.len_bytes();
    }

    fn fill(&self, bytes: usize, value: u8) {
        let mut buf = self.buffer.borrow_mut();
        let len = buf.len();
        for i in 0..bytes {
            buf[(self.cursor + i) % len] = value;
        }
    }

    fn region_is(&self, bytes: usize, value: u8) -> bool {
        let buf = self.buffer.borrow();
        (0..bytes).all(|i| buf[(self.cursor + i) % buf.len()] == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(conn: &mut Connection, v: i32) {
        conn.write(&v.to_ne_bytes());
        conn.advance(1);
    }

    fn take(conn: &mut Connection) -> i32 {
        let mut bytes = [0u8; 4];
        conn.read(1, &mut bytes);
        conn.advance(1);
        i32::from_ne_bytes(bytes)
    }

    #[test]
    fn zero_delay_reads_what_was_written() {
        let mut w = Connection::writer(4, 4);
        let mut r = Connection::reader(&w, 0);
        for v in 1..=10 {
            put(&mut w, v);
            assert_eq!(take(&mut r), v);
        }
    }

    #[test]
    fn delayed_reader_sees_zeros_then_stream() {
        let mut w = Connection::writer(5, 4);
        let mut r = Connection::reader(&w, 3);
        let mut seen = Vec::new();
        for v in 1..=8 {
            put(&mut w, v);
            seen.push(take(&mut r));
        }
        assert_eq!(seen, vec![0, 0, 0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn reader_before_writer_in_tick_order() {
        // Feedback edge: the consumer runs first each tick.
        let mut w = Connection::writer(2, 4);
        let mut r = Connection::reader(&w, 1);
        let mut seen = Vec::new();
        for v in 1..=4 {
            seen.push(take(&mut r));
            put(&mut w, v);
        }
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn chunk_straddling_the_end_is_split() {
        let mut w = Connection::writer(3, 1);
        w.advance(2);
        w.write(&[7, 8]);
        let r = Connection::reader(&w, 0);
        let mut out = [0u8; 2];
        r.read(2, &mut out);
        assert_eq!(out, [7, 8]);
        w.advance(2);
        assert_eq!(w.cursor(), 1);
    }

    #[test]
    fn fan_out_shares_the_writer_buffer() {
        let w = Connection::writer(4, 16);
        let a = Connection::reader(&w, 0);
        let b = Connection::reader(&w, 2);
        assert!(a.shares_buffer(&b));
        assert_eq!(b.position(), 2);
        assert!(!w.shares_buffer(&Connection::writer(4, 16)));
    }

    #[test]
    #[should_panic]
    fn delay_must_fit_capacity() {
        let w = Connection::writer(2, 4);
        let _ = Connection::reader(&w, 2);
    }
}
