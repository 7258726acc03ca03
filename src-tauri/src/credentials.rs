//! 크리덴셜 목록 보조 기능
//!
//! 서버 응답 목록을 화면용으로 거르고 묶는 순수 함수들과 로컬 비밀번호 생성.

use crate::models::{Credential, NewCredential};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use zeroize::Zeroizing;

/// 생성 비밀번호 기본 길이 (랜덤 바이트 수)
pub const DEFAULT_PASSWORD_BYTES: usize = 24;

/// 카테고리 그룹
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum CategoryGroup {
    Named(String),
    /// 카테고리가 비어있는 크리덴셜 (항상 마지막)
    Ungrouped,
}

impl CategoryGroup {
    pub fn of(credential: &Credential) -> Self {
        match credential.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => CategoryGroup::Named(category.to_string()),
            _ => CategoryGroup::Ungrouped,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CategoryGroup::Named(name) => name,
            CategoryGroup::Ungrouped => "No category",
        }
    }
}

/// 카테고리 필터 선택
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(CategoryGroup),
}

/// 목록에 나타난 카테고리 (이름순, 미분류는 마지막)
pub fn categories(items: &[Credential]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = items.iter().map(CategoryGroup::of).collect();
    groups.sort();
    groups.dedup();
    groups
}

/// 이름/사용자명/설명/카테고리에 대소문자 무시 부분 일치
pub fn matches_search(credential: &Credential, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    let contains = |field: Option<&str>| field.is_some_and(|v| v.to_lowercase().contains(&query));

    contains(Some(credential.name.as_str()))
        || contains(credential.username.as_deref())
        || contains(credential.description.as_deref())
        || contains(credential.category.as_deref())
}

/// 카테고리 필터와 검색어 적용
pub fn filter_credentials<'a>(
    items: &'a [Credential],
    category: &CategoryFilter,
    query: &str,
) -> Vec<&'a Credential> {
    items
        .iter()
        .filter(|c| match category {
            CategoryFilter::All => true,
            CategoryFilter::Only(group) => CategoryGroup::of(c) == *group,
        })
        .filter(|c| matches_search(c, query))
        .collect()
}

/// 생성 요청 제출 가능 여부 (이름과 시크릿 필수)
pub fn is_submittable(input: &NewCredential) -> bool {
    !input.name.trim().is_empty() && !input.secret.trim().is_empty()
}

/// URL-safe 랜덤 비밀번호 생성 (`len` 바이트 → base64, 패딩 없음)
///
/// 아직 저장되지 않은 크리덴셜용이므로 시크릿 캐시와 무관하다.
pub fn generate_password(len: usize) -> Zeroizing<String> {
    let mut rng = rand::thread_rng();
    let bytes: Zeroizing<Vec<u8>> = Zeroizing::new((0..len).map(|_| rng.gen()).collect());
    Zeroizing::new(URL_SAFE_NO_PAD.encode(bytes.as_slice()))
}
