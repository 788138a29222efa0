/*!
 * End-to-end publish tests against a real git working tree and bare remote.
 *
 * Skipped when git is not installed.
 */

use anyhow::Result;
use bisub::app_controller::Controller;
use bisub::errors::exit_codes;
use bisub::publisher::PublishResult;

use crate::common::{self, GitFixture};

fn controller() -> Result<Controller> {
    Ok(Controller::with_config(common::native_config())?)
}

#[tokio::test]
async fn test_publish_withRealGit_shouldCommitAsBotAndPush() -> Result<()> {
    common::init_test_logging();
    if !common::git_available() {
        return Ok(());
    }
    let fixture = GitFixture::new(common::BILINGUAL_SRT)?;
    let tools = common::create_temp_dir()?;
    let request = common::web_request(fixture.tree.path(), tools.path(), "refs/heads/main");

    let report = controller()?.run(&request).await?;

    assert!(report.result.is_published());
    assert_eq!(fixture.commit_count()?, 2);
    assert_eq!(fixture.remote_head("main")?, fixture.local_head()?);

    let tree = fixture.tree.path();
    assert_eq!(common::git(tree, &["log", "-1", "--format=%an <%ae>"])?, "subtitle-bot <subtitle-bot@users.noreply.github.com>");
    assert_eq!(common::git(tree, &["log", "-1", "--format=%cn"])?, "subtitle-bot");
    assert!(common::git(tree, &["log", "-1", "--format=%s"])?.contains("web/web.srt"));

    let committed = common::git(tree, &["show", "--name-only", "--format=", "HEAD"])?;
    assert_eq!(committed, "web/web.Chs.srt\nweb/web.Eng&Chs.srt");
    assert!(common::git(tree, &["status", "--porcelain"])?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_publish_withRealGit_twice_shouldNotAddCommit() -> Result<()> {
    if !common::git_available() {
        return Ok(());
    }
    let fixture = GitFixture::new(common::BILINGUAL_SRT)?;
    let tools = common::create_temp_dir()?;
    let request = common::web_request(fixture.tree.path(), tools.path(), "refs/heads/main");

    controller()?.run(&request).await?;
    let head_after_first = fixture.local_head()?;

    let report = controller()?.run(&request).await?;

    assert_eq!(report.result, PublishResult::NothingChanged);
    assert_eq!(fixture.local_head()?, head_after_first);
    assert_eq!(fixture.commit_count()?, 2);

    Ok(())
}

#[tokio::test]
async fn test_publish_withRealGit_andPullRef_shouldPushCheckedOutBranch() -> Result<()> {
    if !common::git_available() {
        return Ok(());
    }
    let fixture = GitFixture::new(common::BILINGUAL_SRT)?;
    let tools = common::create_temp_dir()?;
    let request = common::web_request(fixture.tree.path(), tools.path(), "refs/pull/3/merge");

    let report = controller()?.run(&request).await?;

    assert!(matches!(report.result, PublishResult::Published { ref branch, .. } if branch == "main"));
    assert_eq!(fixture.remote_head("main")?, fixture.local_head()?);

    Ok(())
}

#[tokio::test]
async fn test_publish_withRealGit_andDetachedHead_shouldFailWithoutPushing() -> Result<()> {
    common::init_test_logging();
    if !common::git_available() {
        return Ok(());
    }
    let fixture = GitFixture::new(common::BILINGUAL_SRT)?;
    let remote_before = fixture.remote_head("main")?;
    common::git(fixture.tree.path(), &["checkout", "--detach"])?;

    let tools = common::create_temp_dir()?;
    let request = common::web_request(fixture.tree.path(), tools.path(), &remote_before);

    let error = controller()?.run(&request).await.unwrap_err();

    assert_eq!(error.exit_code(), exit_codes::UNRESOLVED_BRANCH);
    assert_eq!(fixture.remote_head("main")?, remote_before);

    Ok(())
}
