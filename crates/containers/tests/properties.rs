use std::collections::VecDeque;

use nebula_containers::allocator::{StackAllocator, StackStorage};
use nebula_containers::list::List;
use nebula_containers::string::ByteString;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum ListOp {
    PushBack(u16),
    PushFront(u16),
    PopBack,
    PopFront,
    InsertAt(usize, u16),
    EraseAt(usize),
    Reverse,
}

fn list_op() -> impl Strategy<Value = ListOp> {
    prop_oneof![
        3 => any::<u16>().prop_map(ListOp::PushBack),
        3 => any::<u16>().prop_map(ListOp::PushFront),
        1 => Just(ListOp::PopBack),
        1 => Just(ListOp::PopFront),
        2 => (any::<usize>(), any::<u16>()).prop_map(|(at, v)| ListOp::InsertAt(at, v)),
        2 => any::<usize>().prop_map(ListOp::EraseAt),
        1 => Just(ListOp::Reverse),
    ]
}

proptest! {
    #[test]
    fn list_behaves_like_vec_deque(ops in prop::collection::vec(list_op(), 0..200)) {
        let storage = StackStorage::<{ 64 * 1024 }>::boxed();
        let mut list = List::new_in(StackAllocator::new(&*storage));
        let mut model = VecDeque::new();

        for op in ops {
            match op {
                ListOp::PushBack(v) => {
                    list.push_back(v);
                    model.push_back(v);
                }
                ListOp::PushFront(v) => {
                    list.push_front(v);
                    model.push_front(v);
                }
                ListOp::PopBack => prop_assert_eq!(list.pop_back(), model.pop_back()),
                ListOp::PopFront => prop_assert_eq!(list.pop_front(), model.pop_front()),
                ListOp::InsertAt(at, v) => {
                    let at = at % (model.len() + 1);
                    list.cursor_mut_at(at).insert(v);
                    model.insert(at, v);
                }
                ListOp::EraseAt(at) => {
                    let at = at % (model.len() + 1);
                    prop_assert_eq!(list.cursor_mut_at(at).erase(), model.remove(at));
                }
                ListOp::Reverse => {
                    list.reverse();
                    model.make_contiguous().reverse();
                }
            }
            prop_assert_eq!(list.len(), model.len());
        }

        prop_assert!(list.iter().eq(model.iter()));
        prop_assert!(list.iter().rev().eq(model.iter().rev()));
        prop_assert_eq!(list.iter().len(), model.len());
    }

    #[test]
    fn byte_string_search_matches_windows(
        haystack in prop::collection::vec(0u8..4, 0..64),
        needle in prop::collection::vec(0u8..4, 1..4),
    ) {
        let string = ByteString::from_bytes(&haystack);
        let first = haystack.windows(needle.len()).position(|w| w == needle.as_slice());
        let last = haystack.windows(needle.len()).rposition(|w| w == needle.as_slice());
        prop_assert_eq!(string.find(&needle), first);
        prop_assert_eq!(string.rfind(&needle), last);
    }

    #[test]
    fn byte_string_substr_matches_slicing(
        bytes in prop::collection::vec(any::<u8>(), 0..64),
        start in 0usize..80,
        count in 0usize..80,
    ) {
        let string = ByteString::from_bytes(&bytes);
        match string.substr(start, count) {
            Ok(sub) => {
                prop_assert!(start <= bytes.len());
                let end = (start + count).min(bytes.len());
                prop_assert_eq!(sub.as_bytes(), &bytes[start..end]);
                prop_assert_eq!(sub.as_bytes_with_nul().last(), Some(&0));
            }
            Err(error) => {
                prop_assert!(start > bytes.len());
                prop_assert!(error.is_out_of_range());
            }
        }
    }

    #[test]
    fn byte_string_push_keeps_terminator(bytes in prop::collection::vec(1u8.., 0..100)) {
        let mut string = ByteString::new();
        for byte in &bytes {
            string += *byte;
            prop_assert!(string.len() <= string.capacity());
        }
        prop_assert_eq!(string.as_bytes(), bytes.as_slice());
        prop_assert_eq!(string.as_bytes_with_nul()[bytes.len()], 0);
    }
}
