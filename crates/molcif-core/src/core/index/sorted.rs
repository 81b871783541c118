/// Index of the last element of an ascending slice that is `<= value`, or
/// `None` when every element is greater.
pub fn find_predecessor_index(sorted: &[i32], value: i32) -> Option<usize> {
    sorted.partition_point(|&x| x <= value).checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nearest_lower_value() {
        let ids = [5, 8, 12];
        assert_eq!(find_predecessor_index(&ids, 10), Some(1));
        assert_eq!(find_predecessor_index(&ids, 8), Some(1));
        assert_eq!(find_predecessor_index(&ids, 12), Some(2));
        assert_eq!(find_predecessor_index(&ids, 100), Some(2));
    }

    #[test]
    fn values_below_the_first_element_have_no_predecessor() {
        assert_eq!(find_predecessor_index(&[5, 8, 12], 4), None);
        assert_eq!(find_predecessor_index(&[], 4), None);
    }

    #[test]
    fn duplicates_resolve_to_the_last_copy() {
        assert_eq!(find_predecessor_index(&[1, 3, 3, 3, 7], 3), Some(3));
    }
}
