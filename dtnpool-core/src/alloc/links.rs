//! Index-linked doubly linked lists over a shared link array.
//!
//! Every pool slot owns one [`Link`] per link array; a [`LinkList`] only keeps
//! head, tail and length. Several lists may share one array as long as a slot
//! sits in at most one of them at a time (free list, recycle list, a subqueue,
//! the active flow list).

pub(crate) const NIL: u32 = u32::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Link {
    pub(crate) prev: u32,
    pub(crate) next: u32,
}

impl Link {
    pub(crate) const UNLINKED: Link = Link {
        prev: NIL,
        next: NIL,
    };
}

impl Default for Link {
    fn default() -> Self {
        Self::UNLINKED
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LinkList {
    head: u32,
    tail: u32,
    len: usize,
}

impl Default for LinkList {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkList {
    pub(crate) const fn new() -> Self {
        Self {
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.head == NIL
    }

    /// Membership test, only meaningful for the list the slot could be in.
    #[inline]
    pub(crate) fn contains(&self, links: &[Link], index: u32) -> bool {
        let link = links[index as usize];
        link.prev != NIL || link.next != NIL || self.head == index
    }

    pub(crate) fn push_back(&mut self, links: &mut [Link], index: u32) {
        debug_assert_eq!(links[index as usize], Link::UNLINKED);
        links[index as usize] = Link {
            prev: self.tail,
            next: NIL,
        };
        if self.tail == NIL {
            self.head = index;
        } else {
            links[self.tail as usize].next = index;
        }
        self.tail = index;
        self.len += 1;
    }

    pub(crate) fn pop_front(&mut self, links: &mut [Link]) -> Option<u32> {
        if self.head == NIL {
            return None;
        }
        let index = self.head;
        self.unlink(links, index);
        Some(index)
    }

    /// Removes `index` from the list; returns `false` if it was not linked.
    pub(crate) fn unlink(&mut self, links: &mut [Link], index: u32) -> bool {
        if !self.contains(links, index) {
            return false;
        }
        let Link { prev, next } = links[index as usize];
        if prev == NIL {
            self.head = next;
        } else {
            links[prev as usize].next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            links[next as usize].prev = prev;
        }
        links[index as usize] = Link::UNLINKED;
        self.len -= 1;
        true
    }

    /// Moves every entry of `other` to the back of `self` in O(1).
    ///
    /// Returns how many entries moved; `other` is left empty.
    pub(crate) fn append(&mut self, links: &mut [Link], other: &mut LinkList) -> usize {
        let moved = other.len;
        if other.head == NIL {
            return 0;
        }
        if self.tail == NIL {
            self.head = other.head;
        } else {
            links[self.tail as usize].next = other.head;
            links[other.head as usize].prev = self.tail;
        }
        self.tail = other.tail;
        self.len += moved;
        *other = LinkList::new();
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(list: &mut LinkList, links: &mut [Link]) -> Vec<u32> {
        std::iter::from_fn(|| list.pop_front(links)).collect()
    }

    #[test]
    fn fifo_order_and_unlink_from_middle() {
        let mut links = vec![Link::default(); 5];
        let mut list = LinkList::new();
        for i in 0..5 {
            list.push_back(&mut links, i);
        }
        assert!(list.unlink(&mut links, 2));
        assert!(!list.unlink(&mut links, 2));
        assert_eq!(list.len(), 4);
        assert_eq!(drain(&mut list, &mut links), vec![0, 1, 3, 4]);
        assert!(list.is_empty());
        assert!(links.iter().all(|l| *l == Link::UNLINKED));
    }

    #[test]
    fn append_splices_whole_list() {
        let mut links = vec![Link::default(); 6];
        let mut a = LinkList::new();
        let mut b = LinkList::new();
        for i in 0..2 {
            a.push_back(&mut links, i);
        }
        for i in 2..6 {
            b.push_back(&mut links, i);
        }

        assert_eq!(a.append(&mut links, &mut b), 4);
        assert!(b.is_empty());
        assert_eq!(b.len(), 0);
        assert_eq!(a.len(), 6);
        assert_eq!(drain(&mut a, &mut links), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn append_onto_empty_list() {
        let mut links = vec![Link::default(); 3];
        let mut a = LinkList::new();
        let mut b = LinkList::new();
        for i in 0..3 {
            b.push_back(&mut links, i);
        }
        assert_eq!(a.append(&mut links, &mut b), 3);
        assert_eq!(a.append(&mut links, &mut b), 0);
        assert_eq!(drain(&mut a, &mut links), vec![0, 1, 2]);
    }
}
