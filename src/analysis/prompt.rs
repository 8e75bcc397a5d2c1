use super::llm::{ChatMessage, Role};
use crate::pr::PullRequestContext;

pub const NO_DESCRIPTION: &str = "No description provided";

const SYSTEM_PROMPT: &str = "You are an expert code reviewer. \
You analyze code changes with a focus on security, quality, and performance.";

/// Build the system + user messages for one review request.
pub fn build_messages(ctx: &PullRequestContext, diff: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: Role::System,
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: Role::User,
            content: build_review_prompt(ctx, diff),
        },
    ]
}

pub fn build_review_prompt(ctx: &PullRequestContext, diff: &str) -> String {
    let description = ctx
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(NO_DESCRIPTION);

    format!(
        r#"You are a professional code reviewer. Analyze the changes in the following Pull Request and provide a detailed review.

# PR information
- Title: {title}
- Author: {author}
- Branch: {base} <- {head}
- Description: {description}

# Changed code (diff)
```diff
{diff}
```

# What to analyze

## 1. Security
- Exposed secrets such as API keys, passwords, or tokens
- Vulnerabilities such as SQL injection or XSS
- Soundness of authentication and authorization logic
- Missing input validation

## 2. Code quality
- Duplicated code
- Naming of functions and variables
- Complexity (overly long functions, deep nesting)
- Opportunities for better design

## 3. Possible bugs
- Missing null/undefined handling
- Insufficient error handling
- Boundary conditions
- Type mismatches

## 4. Tests
- Whether tests exist for the change
- Adequacy of coverage
- Missing edge-case tests

## 5. Performance
- Unnecessary loops or computation
- Possible memory leaks
- Database queries that need optimization

# Output format

Respond with JSON in exactly this shape:

{{
  "summary": "Overall summary of the PR (2-3 sentences)",
  "risks": [
    {{
      "severity": "high|medium|low",
      "category": "security|quality|bug|test|performance",
      "description": "Description of the risk",
      "location": "file:line (when possible)"
    }}
  ],
  "suggestions": [
    {{
      "priority": "required|recommended|optional",
      "description": "What to improve",
      "example": "Example code (optional)"
    }}
  ],
  "positive_points": [
    "Things done well"
  ],
  "overall_rating": "1-10 (out of 10)"
}}

Important: respond with valid JSON only. Do not add explanations or markdown."#,
        title = ctx.title,
        author = ctx.author,
        base = ctx.base_branch,
        head = ctx.head_branch,
        description = description,
        diff = diff,
    )
}
