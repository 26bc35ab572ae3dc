use serde::Serialize;

use crate::{
    constants::{MAX_PAGE_SIZE, PAGE_SIZE},
    form::Form,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn from_form(form: &Form) -> Self {
        let page = form.get_number::<i64>("page").filter(|page| *page >= 1).unwrap_or(1);
        let limit = form
            .get_number::<i64>("limit")
            .filter(|limit| *limit >= 1)
            .map(|limit| limit.min(MAX_PAGE_SIZE))
            .unwrap_or(PAGE_SIZE);

        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

#[derive(Serialize, Debug)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, request: PageRequest) -> Self {
        let has_next = request.offset() + request.limit < total_rows;
        let has_previous = request.page > 1 && total_rows > 0;

        Self {
            count: total_rows,
            next: has_next.then_some(request.page + 1),
            previous: has_previous.then_some(request.page - 1),
            results: rows,
        }
    }

    pub fn with_results<U>(self, results: Vec<U>) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request(page: i64, limit: i64) -> PageRequest {
        PageRequest { page, limit }
    }

    #[rstest]
    fn middle_page_links_both_ways() {
        let page = Page::from_rows(vec![1, 2], 6, request(2, 2));

        assert_eq!(page.count, 6);
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));
    }

    #[rstest]
    fn last_page_has_no_next() {
        let page = Page::from_rows(vec![5], 5, request(3, 2));

        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(2));
    }

    #[rstest]
    fn page_past_the_end_keeps_total() {
        let page = Page::<i32>::from_rows(vec![], 5, request(9, 2));

        assert_eq!(page.count, 5);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(8));
    }

    #[rstest]
    fn empty_result() {
        let page = Page::<i32>::from_rows(vec![], 0, PageRequest::default());

        assert_eq!(page.next, None);
        assert_eq!(page.previous, None);
        assert!(page.results.is_empty());
    }

    #[rstest]
    #[case(&[("page", "3"), ("limit", "10")], 3, 10)]
    #[case(&[("page", "0")], 1, PAGE_SIZE)]
    #[case(&[("limit", "100000")], 1, MAX_PAGE_SIZE)]
    #[case(&[("page", "x"), ("limit", "-4")], 1, PAGE_SIZE)]
    fn request_from_query(#[case] pairs: &[(&str, &str)], #[case] page: i64, #[case] limit: i64) {
        let form = Form::from_data(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );

        assert_eq!(PageRequest::from_form(&form), request(page, limit));
    }

    #[rstest]
    fn offset_is_zero_based() {
        assert_eq!(request(1, 6).offset(), 0);
        assert_eq!(request(3, 6).offset(), 12);
    }
}
